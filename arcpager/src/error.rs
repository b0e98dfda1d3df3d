//! Error taxonomy for archive listing, extraction, and navigation.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A member was absent from a freshly listed container.
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Opening or listing a container failed.
    #[error("archive error: {0}")]
    Archive(String),

    /// A backend failed to materialize a member's payload.
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("image error: {0}")]
    Image(String),

    /// The operation is only meaningful on a filesystem-backed archive.
    #[error("not a directory archive: {0}")]
    NotADirectory(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
