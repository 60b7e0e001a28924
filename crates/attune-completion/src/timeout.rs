//! Racing a future against a fixed deadline.

use std::future::Future;
use std::time::Duration;

/// Outcome of racing a future against a deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedResult<T> {
    /// The future settled within the limit.
    Completed(T),
    /// The deadline won. The future was dropped unfinished.
    TimedOut,
}

impl<T> TimedResult<T> {
    /// The completed value, if the future won the race.
    pub fn into_completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::TimedOut => None,
        }
    }

    /// True when the deadline won.
    pub fn timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }
}

/// Race `future` against `limit`, whichever settles first.
///
/// The losing side is dropped, never awaited further: a timed-out future
/// cannot surface a late result or error anywhere.
pub async fn race_with_timeout<F>(limit: Duration, future: F) -> TimedResult<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(limit, future).await {
        Ok(value) => TimedResult::Completed(value),
        Err(_elapsed) => TimedResult::TimedOut,
    }
}
