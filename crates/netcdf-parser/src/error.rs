//! Error types for profile file reading.

use thiserror::Error;

/// Result type for profile file operations.
pub type ProfileFileResult<T> = Result<T, ProfileFileError>;

/// Errors that can occur opening a profile dataset.
///
/// Field-level extraction never surfaces errors; it degrades to missing
/// markers. Only opening/decoding the container itself can fail.
#[derive(Error, Debug)]
pub enum ProfileFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a NetCDF dataset: {0}")]
    InvalidFormat(String),

    #[error("Not a profile file: missing {0} dimension")]
    NotAProfileFile(&'static str),
}
