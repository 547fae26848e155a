use crate::{
    manifest::{Manifest, ManifestEntry},
    operator::ToolCommand,
};
use dirplan::{DirectorySet, Ordering};

/// Everything a run will do to an image, worked out before the first tool call.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Directories to create, parents first.
    pub directories: Vec<String>,
    /// Files to copy, in manifest order.
    pub entries: Vec<ManifestEntry>,
}
impl Plan {
    pub fn build(manifest: Manifest, ordering: Ordering) -> Self {
        let set = DirectorySet::from_destinations(manifest.destinations());

        let directories = set.ordered(ordering);

        if let Err(error) = dirplan::check_order(&directories) {
            log::warn!("{} ordering is unsafe for this manifest: {}", ordering, error);
        }

        log::debug!(
            "planned {} directories and {} files ({} ordering)",
            directories.len(),
            manifest.entries.len(),
            ordering
        );

        Self {
            directories,
            entries: manifest.entries,
        }
    }

    /// Tool commands in execution order: every mkdir, then every copy, then every listing.
    pub fn commands(&self, marker: &str) -> Vec<ToolCommand> {
        let mkdirs = self
            .directories
            .iter()
            .map(|dir| ToolCommand::mkdir(marker, dir));
        let copies = self
            .entries
            .iter()
            .map(|entry| ToolCommand::copy(marker, &entry.source, &entry.destination));
        let listings = self
            .directories
            .iter()
            .map(|dir| ToolCommand::list(marker, dir));

        mkdirs.chain(copies).chain(listings).collect()
    }
}
