//! Session error taxonomy.

use thiserror::Error;

/// Ways `send` can reject a turn.
///
/// Both variants are local no-ops: nothing is appended, nothing is sent,
/// and the session remains fully usable. Completion failures never appear
/// here; they collapse into the fallback reply inside the turn.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A turn is already in flight; the new send was rejected untouched.
    #[error("a turn is already being processed")]
    Busy,

    /// The message text was empty or whitespace-only.
    #[error("message text is empty")]
    EmptyMessage,
}
