use crate::errors::{FileOperation, IoError};
use miette::Diagnostic;
use std::{fs, path::Path};
use thiserror::Error;

const SEPARATOR: char = '=';

#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("I/O error within manifest domain")]
    #[diagnostic(code(imgfill::manifest::io))]
    Io(#[from] IoError),
}

/// One `DEST=SRC` mapping: a path on the image and the local file that goes there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub destination: String,
    pub source: String,
}

/// The entries of a manifest, in file order.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}
impl Manifest {
    /// Parses manifest text.
    ///
    /// Each line is trimmed, then split at its first `=`. Lines without `=` are comments or
    /// blanks and are skipped. Source paths are not checked here.
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .map(str::trim)
            .filter_map(|line| line.split_once(SEPARATOR))
            .map(|(destination, source)| ManifestEntry {
                destination: destination.to_string(),
                source: source.to_string(),
            })
            .collect();

        Self { entries }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path)
            .map_err(|error| IoError::new(FileOperation::ReadManifest, path, error))?;

        let manifest = Self::parse(&content);

        log::debug!(
            "parsed {} entries from manifest: {}",
            manifest.entries.len(),
            path.display()
        );

        Ok(manifest)
    }

    pub fn destinations(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.destination.as_str())
    }
}
