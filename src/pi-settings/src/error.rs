//! Error types for pi-settings.

use thiserror::Error;

/// Settings store error types.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Home directory not found.
    #[error("could not determine home directory")]
    HomeDirNotFound,
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;
