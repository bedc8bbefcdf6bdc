use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a batch before any file is converted
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("please select both a source and a destination directory")]
    MissingDirectory,

    #[error("quality must be a number between 1 and 100 (got {0:?})")]
    InvalidQuality(String),

    #[error("source directory {} cannot be read: {source}", path.display())]
    DirectoryNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("destination directory {} cannot be created: {source}", path.display())]
    DestinationUnwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A single file that could not be converted. Never aborts the batch.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("failed to convert {filename}: {cause}")]
pub struct ConvertError {
    pub filename: String,
    pub cause: String,
}

impl ConvertError {
    pub fn new(filename: impl Into<String>, cause: &anyhow::Error) -> Self {
        Self {
            filename: filename.into(),
            cause: format!("{cause:#}"),
        }
    }
}
