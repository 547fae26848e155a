// Directory planning for image population: which directories must exist, and in what order.
use errors::{OrderError, ParseOrderingError};
use indexmap::IndexSet;
use std::collections::HashMap;
pub mod errors;

/// Returns the parent of a destination path by stripping its final `/` component.
///
/// A destination without any `/` has no parent and yields `""`.
/// ```
/// assert_eq!(dirplan::parent_dir("a/b/c/file.txt"), "a/b/c");
/// assert_eq!(dirplan::parent_dir("file.txt"), "");
/// ```
pub fn parent_dir(destination: &str) -> &str {
    match destination.rfind('/') {
        Some(idx) => &destination[..idx],
        None => "",
    }
}

/// Normalizes a directory path to the rooted form used throughout this crate:
/// every component is preceded by a single `/` and empty components are dropped.
///
/// `a//b/`, `/a/b` and `a/b` all become `/a/b`. A path without components becomes `""`.
pub fn normalize_dir(dir: &str) -> String {
    let mut normalized = String::with_capacity(dir.len() + 1);

    for component in dir.split('/').filter(|c| !c.is_empty()) {
        normalized.push('/');
        normalized.push_str(component);
    }

    normalized
}

/// Yields every prefix of an already normalized directory, root first, ending with the
/// directory itself. The prefixes borrow from `normalized`, nothing is allocated.
///
/// `/a/b/c` yields `/a`, `/a/b`, `/a/b/c`. An empty input yields nothing.
pub fn prefixes(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .match_indices('/')
        .map(|(idx, _)| idx)
        .skip(1)
        .chain(std::iter::once(normalized.len()))
        .filter(|&end| end > 0)
        .map(move |end| &normalized[..end])
}

/// Owned version of [`prefixes`] for an arbitrary (not yet normalized) directory path.
pub fn ancestor_chain(dir: &str) -> Vec<String> {
    let normalized = normalize_dir(dir);

    prefixes(&normalized).map(str::to_owned).collect()
}

/// Returns `true` if `ancestor` is a strict ancestor of `descendant`.
/// Both paths must be normalized.
pub fn is_ancestor(ancestor: &str, descendant: &str) -> bool {
    descendant.len() > ancestor.len()
        && descendant.starts_with(ancestor)
        && descendant[ancestor.len()..].starts_with('/')
}

/// Sort key applied to a [`DirectorySet`] to put parents before children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ordering {
    /// Ascending path length in characters.
    #[default]
    Length,
    /// Ascending number of path components.
    Depth,
}
impl Ordering {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Depth => "depth",
        }
    }

    fn key(&self, dir: &str) -> usize {
        match self {
            Self::Length => dir.chars().count(),
            Self::Depth => dir.matches('/').count(),
        }
    }
}
impl std::str::FromStr for Ordering {
    type Err = ParseOrderingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "length" => Ok(Self::Length),
            "depth" => Ok(Self::Depth),
            _ => Err(ParseOrderingError {
                value: value.to_string(),
            }),
        }
    }
}
impl std::fmt::Display for Ordering {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The distinct directories a set of destinations needs, in discovery order.
///
/// Membership is global: a directory shared by many destinations is recorded once,
/// the first time it is discovered. Discovery order keeps parents before children
/// within one destination but not across destinations, use [`DirectorySet::ordered`]
/// for a creation order.
#[derive(Debug, Clone, Default)]
pub struct DirectorySet {
    dirs: IndexSet<String>,
}
impl DirectorySet {
    pub fn new() -> Self {
        Self {
            dirs: IndexSet::new(),
        }
    }

    /// Builds the set from every destination path in order.
    ///
    /// # Example
    /// ```
    /// let set = dirplan::DirectorySet::from_destinations(["a/b/c/file.txt", "a/b/d/file2.txt"]);
    /// let ordered = set.ordered(dirplan::Ordering::Length);
    ///
    /// assert_eq!(ordered, vec!["/a", "/a/b", "/a/b/c", "/a/b/d"]);
    /// ```
    pub fn from_destinations<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();

        for destination in destinations {
            set.insert_destination(destination.as_ref());
        }

        set
    }

    /// Records the ancestors of `destination`'s parent directory, and the parent itself.
    /// Returns how many directories were newly discovered.
    pub fn insert_destination(&mut self, destination: &str) -> usize {
        let normalized = normalize_dir(parent_dir(destination));
        let mut added = 0;

        for prefix in prefixes(&normalized) {
            // only allocate for directories not seen yet
            if !self.dirs.contains(prefix) {
                self.dirs.insert(prefix.to_owned());
                added += 1;
            }
        }

        added
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn contains(&self, dir: &str) -> bool {
        self.dirs.contains(dir)
    }

    /// Iterates in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.dirs.iter().map(String::as_str)
    }

    /// Returns the directories sorted by `ordering`. The sort is stable, so directories
    /// with equal keys keep their discovery order.
    pub fn ordered(&self, ordering: Ordering) -> Vec<String> {
        let mut ordered: Vec<String> = self.dirs.iter().cloned().collect();

        ordered.sort_by_key(|dir| ordering.key(dir));

        ordered
    }
}

/// Verifies that no directory in `ordered` comes before one of its own ancestors.
///
/// Ancestors absent from `ordered` are not considered. Returns the first offending pair.
pub fn check_order<S: AsRef<str>>(ordered: &[S]) -> Result<(), OrderError> {
    let positions: HashMap<&str, usize> = ordered
        .iter()
        .enumerate()
        .map(|(idx, dir)| (dir.as_ref(), idx))
        .collect();

    for (idx, dir) in ordered.iter().enumerate() {
        let dir = dir.as_ref();

        for ancestor in prefixes(dir).filter(|prefix| *prefix != dir) {
            match positions.get(ancestor) {
                Some(&ancestor_idx) if ancestor_idx > idx => {
                    return Err(OrderError::AncestorAfterDescendant {
                        ancestor: ancestor.to_string(),
                        descendant: dir.to_string(),
                    });
                }
                _ => {}
            }
        }
    }

    Ok(())
}
