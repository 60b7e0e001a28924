//! Settings error types.

use thiserror::Error;

/// Convenience alias for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors while loading settings from disk.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file was not valid JSON (or did not fit the schema).
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}
