use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FileOperation {
    #[error("reading the manifest")]
    ReadManifest,
    #[error("reading the config file")]
    ReadConfig,
    #[error("writing the listing")]
    WriteListing,
}
#[derive(Debug, Error, Diagnostic)]
#[error("I/O error while {operation}: '{}'", .path.display())]
#[diagnostic(
    code(imgfill::io),
    help("Check that the path exists and that you are allowed to access it.")
)]
pub struct IoError {
    pub operation: FileOperation,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
impl IoError {
    pub fn new(operation: FileOperation, path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self {
            operation,
            path: path.into(),
            source: error,
        }
    }
}
