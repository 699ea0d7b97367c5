use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Generic I/O error (reading, writing, or creating files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// JSON (de)serialization failure for the structured file formats.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An identifier would escape the data directory if used as a file name.
    #[error("Unsafe file name: {0:?}")]
    UnsafeName(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
