//! Error types for the inference boundary.

use thiserror::Error;

/// Errors surfaced by backend loaders and classifiers.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// A backend's load routine failed. The backend latches in the failed
    /// state until an explicit reset.
    #[error("backend load failed: {0}")]
    LoadFailed(String),

    /// A loaded classifier failed on a single invocation. The capture loop
    /// skips the sample and keeps polling.
    #[error("classifier error: {0}")]
    Classifier(String),

    /// The backend could not be reached at all.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
