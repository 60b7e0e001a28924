//! Error types for the completion boundary.

use thiserror::Error;

/// Errors a chat backend can surface. The completion client catches every
/// one of these and substitutes the fallback reply; nothing here reaches
/// the conversation.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// Transport-level failure from the HTTP client.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("chat endpoint returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body, or the status reason when the body was empty.
        message: String,
    },

    /// The endpoint answered 200 but the body did not match the wire
    /// contract.
    #[error("malformed chat response: {0}")]
    MalformedResponse(String),

    /// The service could not be reached at all.
    #[error("chat service unavailable: {0}")]
    Unavailable(String),
}
