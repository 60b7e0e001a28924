//! Fallback-guaranteed completion calls.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::backend::ChatBackend;
use crate::timeout::{TimedResult, race_with_timeout};

/// Reply substituted whenever the real completion call fails or times
/// out. Deliberately gentle: the person on the other side may be in a
/// fragile moment, and a stack trace is the last thing they need.
pub const FALLBACK_REPLY: &str = "I'm having a little trouble responding right now, \
but I'm still here with you. Could you try saying that again in a moment?";

/// Tunables for [`CompletionClient`].
#[derive(Clone, Debug)]
pub struct CompletionConfig {
    /// Hard ceiling on one completion call.
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
        }
    }
}

/// Calls the chat backend with a hard deadline and a guaranteed reply.
///
/// `complete` is infallible by design: a timeout or backend error
/// collapses into the fixed [`FALLBACK_REPLY`], so every conversation
/// turn produces assistant text. One attempt per call, no retries.
pub struct CompletionClient {
    backend: Arc<dyn ChatBackend>,
    config: CompletionConfig,
}

impl CompletionClient {
    /// Client with the default 15 second ceiling.
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self::with_config(backend, CompletionConfig::default())
    }

    /// Client with explicit tunables.
    #[must_use]
    pub fn with_config(backend: Arc<dyn ChatBackend>, config: CompletionConfig) -> Self {
        Self { backend, config }
    }

    /// Deadline currently in force.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// One completion attempt, racing the backend against the deadline.
    /// The losing side is dropped; its eventual result never surfaces.
    #[instrument(skip_all, fields(prompt_len = prompt.len()))]
    pub async fn complete(&self, prompt: &str) -> String {
        match race_with_timeout(self.config.timeout, self.backend.chat(prompt)).await {
            TimedResult::Completed(Ok(reply)) => {
                counter!("completion_turns_total", "outcome" => "ok").increment(1);
                debug!(reply_len = reply.content.len(), "completion settled");
                reply.content
            }
            TimedResult::Completed(Err(error)) => {
                counter!("completion_turns_total", "outcome" => "fallback").increment(1);
                warn!(%error, "completion failed, substituting the fallback reply");
                FALLBACK_REPLY.to_string()
            }
            TimedResult::TimedOut => {
                counter!("completion_turns_total", "outcome" => "fallback").increment(1);
                warn!(
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "completion timed out, substituting the fallback reply"
                );
                FALLBACK_REPLY.to_string()
            }
        }
    }
}
