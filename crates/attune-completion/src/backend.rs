//! The chat backend seam and its scripted mock.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;

use crate::errors::CompletionError;

/// One reply from the conversational service.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    /// Assistant text.
    pub content: String,
    /// Role reported by the service, normally `assistant`.
    pub role: String,
}

impl ChatReply {
    /// Assistant-role reply with the given text.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            role: "assistant".into(),
        }
    }
}

/// The conversational service the completion client calls.
///
/// Implementations must be cheap to call concurrently; the session layer
/// already serializes turns, so `chat` sees at most one in-flight prompt
/// per session.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one assembled prompt and return the service's reply.
    async fn chat(&self, prompt: &str) -> Result<ChatReply, CompletionError>;

    /// Cheap reachability check, used by the chat backend loader. Only a
    /// transport-level failure counts as unreachable.
    async fn probe(&self) -> Result<(), CompletionError>;
}

/// Scripted backend for tests and the CLI's offline mode.
///
/// Replays scripted steps in order and records every prompt it receives.
/// An exhausted script reports the service unavailable, so over-calling
/// in a test shows up as a failure instead of a silent success.
pub struct MockChatBackend {
    script: Mutex<VecDeque<Result<ChatReply, CompletionError>>>,
    repeat: Option<ChatReply>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
    probe_ok: bool,
}

impl MockChatBackend {
    /// Backend replaying `steps` in order.
    #[must_use]
    pub fn scripted(steps: Vec<Result<ChatReply, CompletionError>>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            repeat: None,
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
            probe_ok: true,
        }
    }

    /// Backend answering every prompt with the same reply.
    #[must_use]
    pub fn always(content: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(ChatReply::assistant(content)),
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
            probe_ok: true,
        }
    }

    /// Sleep this long before answering each `chat` call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make `probe` report the service unreachable.
    #[must_use]
    pub fn unreachable(mut self) -> Self {
        self.probe_ok = false;
        self
    }

    /// The most recent prompt passed to `chat`.
    #[must_use]
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }

    /// Every prompt received so far, in call order.
    #[must_use]
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Number of `chat` calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn chat(&self, prompt: &str) -> Result<ChatReply, CompletionError> {
        self.prompts.lock().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(step) = self.script.lock().pop_front() {
            return step;
        }
        match &self.repeat {
            Some(reply) => Ok(reply.clone()),
            None => Err(CompletionError::Unavailable("script exhausted".into())),
        }
    }

    async fn probe(&self) -> Result<(), CompletionError> {
        if self.probe_ok {
            Ok(())
        } else {
            Err(CompletionError::Unavailable("scripted as unreachable".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn scripted_backend_replays_in_order() {
        let backend = MockChatBackend::scripted(vec![
            Ok(ChatReply::assistant("first")),
            Err(CompletionError::Unavailable("down".into())),
        ]);

        assert_eq!(
            backend.chat("one").await.unwrap(),
            ChatReply::assistant("first")
        );
        assert_matches!(
            backend.chat("two").await,
            Err(CompletionError::Unavailable(_))
        );
    }

    #[tokio::test]
    async fn exhausted_script_reports_unavailable() {
        let backend = MockChatBackend::scripted(Vec::new());
        assert_matches!(
            backend.chat("anything").await,
            Err(CompletionError::Unavailable(_))
        );
    }

    #[tokio::test]
    async fn always_backend_repeats_and_records_prompts() {
        let backend = MockChatBackend::always("I'm listening.");

        assert_eq!(backend.chat("a").await.unwrap().content, "I'm listening.");
        assert_eq!(backend.chat("b").await.unwrap().content, "I'm listening.");
        assert_eq!(backend.prompts(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(backend.last_prompt().as_deref(), Some("b"));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn probe_honors_the_unreachable_knob() {
        let up = MockChatBackend::always("hi");
        assert!(up.probe().await.is_ok());

        let down = MockChatBackend::always("hi").unreachable();
        assert_matches!(down.probe().await, Err(CompletionError::Unavailable(_)));
    }

    #[test]
    fn reply_deserializes_from_wire_shape() {
        let reply: ChatReply =
            serde_json::from_value(serde_json::json!({"content": "hello", "role": "assistant"}))
                .unwrap();
        assert_eq!(reply, ChatReply::assistant("hello"));
    }
}
