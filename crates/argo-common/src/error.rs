//! Error types for argo-ingest services.

use thiserror::Error;

/// Result type alias using ArgoError.
pub type ArgoResult<T> = Result<T, ArgoError>;

/// Primary error type for ingestion and query operations.
#[derive(Debug, Error)]
pub enum ArgoError {
    // === Source Errors ===
    #[error("Invalid or unsupported source: {0}")]
    InvalidSource(String),

    #[error("Download failed: {0}")]
    Download(String),

    // === Data Errors ===
    #[error("Failed to read NetCDF data: {0}")]
    DatasetRead(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // === Storage Errors ===
    #[error("Database error: {0}")]
    DatabaseError(String),

    // === Infrastructure Errors ===
    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ArgoError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            ArgoError::InvalidSource(_) | ArgoError::InvalidParameter { .. } => 400,
            ArgoError::Upstream(_) => 502,
            _ => 500,
        }
    }
}

impl From<std::io::Error> for ArgoError {
    fn from(err: std::io::Error) -> Self {
        ArgoError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for ArgoError {
    fn from(err: serde_json::Error) -> Self {
        ArgoError::InternalError(format!("JSON error: {}", err))
    }
}
