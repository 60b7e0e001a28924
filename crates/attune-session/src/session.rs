//! The conversation session: ordered history behind a single-writer gate.
//!
//! One session is one conversation. Turns are strictly sequential: a
//! `processing` flag admits exactly one `send` at a time, and a rejected
//! send is a pure no-op. The completion side is infallible from here:
//! timeouts and backend errors arrive as the fixed fallback reply, so a
//! turn that starts always finishes and the history never holds a user
//! message without its assistant counterpart.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use attune_completion::CompletionClient;
use attune_core::affect::{FacialExpression, VocalTone};
use attune_core::events::{BaseEvent, SessionEvent};
use attune_core::ids::SessionId;
use attune_core::messages::{AgeGroup, Message, Mood};
use metrics::counter;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

use crate::errors::SessionError;
use crate::events::EventEmitter;
use crate::prompt::{PromptParams, build_prompt};

/// Clears the processing flag on every exit path of a turn.
struct TurnGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One conversation: ordered messages, the turn gate, and the affect
/// hints recorded at send time.
///
/// The completion client and event emitter are injected; the session has
/// no ambient globals and any number of sessions can coexist.
pub struct ConversationSession {
    id: SessionId,
    messages: Mutex<Vec<Message>>,
    age_group: Mutex<AgeGroup>,
    processing: AtomicBool,
    turns: AtomicU32,
    completion: CompletionClient,
    emitter: Arc<EventEmitter>,
}

impl ConversationSession {
    /// Session with a fresh ID at the adult baseline.
    #[must_use]
    pub fn new(completion: CompletionClient, emitter: Arc<EventEmitter>) -> Self {
        Self::with_age_group(completion, emitter, AgeGroup::default())
    }

    /// Session for a declared age bracket.
    ///
    /// Emits `session_start`; subscribe to the emitter before constructing
    /// to observe it.
    #[must_use]
    pub fn with_age_group(
        completion: CompletionClient,
        emitter: Arc<EventEmitter>,
        age_group: AgeGroup,
    ) -> Self {
        let session = Self {
            id: SessionId::new(),
            messages: Mutex::new(Vec::new()),
            age_group: Mutex::new(age_group),
            processing: AtomicBool::new(false),
            turns: AtomicU32::new(0),
            completion,
            emitter,
        };
        session.emit(SessionEvent::SessionStart {
            base: session.base(),
        });
        session
    }

    /// Run one conversation turn and return the assistant message.
    ///
    /// `emotion` and `tone` are the stable affect verdicts at send time;
    /// they tag the user message and annotate the prompt. Rejections
    /// ([`SessionError::Busy`] while a turn is in flight,
    /// [`SessionError::EmptyMessage`] for blank text) append nothing and
    /// send nothing. A completion failure is not a rejection: the turn
    /// completes with the fixed fallback reply as the assistant message.
    #[instrument(skip_all, fields(session = %self.id))]
    pub async fn send(
        &self,
        text: &str,
        emotion: Option<FacialExpression>,
        tone: Option<VocalTone>,
    ) -> Result<Message, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let _guard = self.acquire_turn()?;

        let turn = self.turns.fetch_add(1, Ordering::Relaxed) + 1;
        self.emit(SessionEvent::TurnStart {
            base: self.base(),
            turn,
        });

        // The prompt renders the history as it stood before this turn;
        // the new message enters the prompt through its own segment.
        let history = self.messages.lock().clone();
        let age_group = *self.age_group.lock();

        self.append(Message::user_with_mood(text, Mood::new(emotion, tone)));

        let prompt = build_prompt(&PromptParams {
            message: text,
            age_group,
            detected_emotion: emotion,
            detected_tone: tone,
            history: &history,
        });
        let reply = self.completion.complete(&prompt).await;

        let assistant = Message::assistant(reply);
        self.append(assistant.clone());

        counter!("session_turns_total").increment(1);
        self.emit(SessionEvent::TurnEnd {
            base: self.base(),
            turn,
        });
        debug!(turn, "turn completed");
        Ok(assistant)
    }

    /// This session's unique ID.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Defensive copy of the conversation so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Number of messages in the history.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.lock().len()
    }

    /// True while a turn is in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Age bracket currently in force.
    #[must_use]
    pub fn age_group(&self) -> AgeGroup {
        *self.age_group.lock()
    }

    /// Change the age bracket. Applies from the next `send`; messages
    /// already in the history are untouched.
    pub fn set_age_group(&self, age_group: AgeGroup) {
        *self.age_group.lock() = age_group;
    }

    /// Drop the whole history and start the conversation over. Turn
    /// numbering keeps counting.
    pub fn clear_messages(&self) {
        self.messages.lock().clear();
    }

    /// Subscribe to this session's event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.emitter.subscribe()
    }

    fn acquire_turn(&self) -> Result<TurnGuard<'_>, SessionError> {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SessionError::Busy);
        }
        Ok(TurnGuard {
            flag: &self.processing,
        })
    }

    fn append(&self, message: Message) {
        self.messages.lock().push(message.clone());
        self.emit(SessionEvent::MessageAppended {
            base: self.base(),
            message,
        });
    }

    fn base(&self) -> BaseEvent {
        BaseEvent::now(self.id.to_string())
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.emitter.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use attune_completion::{ChatReply, CompletionError, FALLBACK_REPLY, MockChatBackend};
    use attune_core::messages::Role;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::prompt::CHILDREN_MODIFIER;

    fn session_with(backend: Arc<MockChatBackend>) -> ConversationSession {
        ConversationSession::new(
            CompletionClient::new(backend),
            Arc::new(EventEmitter::new()),
        )
    }

    fn contents(messages: &[Message]) -> Vec<(Role, &str)> {
        messages
            .iter()
            .map(|m| (m.role, m.content.as_str()))
            .collect()
    }

    // ── Turn processing ──

    #[tokio::test]
    async fn a_turn_appends_user_then_assistant() {
        let backend = Arc::new(MockChatBackend::always("I'm listening."));
        let session = session_with(Arc::clone(&backend));

        let reply = session.send("rough morning", None, None).await.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "I'm listening.");

        let messages = session.messages();
        assert_eq!(
            contents(&messages),
            vec![
                (Role::User, "rough morning"),
                (Role::Assistant, "I'm listening."),
            ]
        );
        assert!(!session.is_processing());
    }

    #[tokio::test]
    async fn sequential_sends_keep_strict_order() {
        let backend = Arc::new(MockChatBackend::scripted(vec![
            Ok(ChatReply::assistant("r1")),
            Ok(ChatReply::assistant("r2")),
        ]));
        let session = session_with(Arc::clone(&backend));

        let _ = session.send("A", None, None).await.unwrap();
        let _ = session.send("B", None, None).await.unwrap();

        assert_eq!(
            contents(&session.messages()),
            vec![
                (Role::User, "A"),
                (Role::Assistant, "r1"),
                (Role::User, "B"),
                (Role::Assistant, "r2"),
            ]
        );
    }

    #[tokio::test]
    async fn blank_text_is_rejected_without_side_effects() {
        let backend = Arc::new(MockChatBackend::always("hi"));
        let session = session_with(Arc::clone(&backend));

        assert_matches!(
            session.send("", None, None).await,
            Err(SessionError::EmptyMessage)
        );
        assert_matches!(
            session.send("   \n\t ", None, None).await,
            Err(SessionError::EmptyMessage)
        );
        assert_eq!(session.message_count(), 0);
        assert_eq!(backend.call_count(), 0);
        assert!(!session.is_processing());
    }

    #[tokio::test(start_paused = true)]
    async fn a_busy_session_rejects_the_second_send() {
        let backend = Arc::new(
            MockChatBackend::scripted(vec![
                Ok(ChatReply::assistant("r1")),
                Ok(ChatReply::assistant("r2")),
            ])
            .with_delay(Duration::from_secs(2)),
        );
        let session = Arc::new(session_with(Arc::clone(&backend)));

        let first = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.send("A", None, None).await })
        };
        while !session.is_processing() {
            tokio::task::yield_now().await;
        }

        assert_matches!(
            session.send("B", None, None).await,
            Err(SessionError::Busy)
        );

        let reply = first.await.unwrap().unwrap();
        assert_eq!(reply.content, "r1");
        assert_eq!(backend.call_count(), 1);

        // The rejected send left no trace; a fresh send still works.
        let _ = session.send("B", None, None).await.unwrap();
        assert_eq!(
            contents(&session.messages()),
            vec![
                (Role::User, "A"),
                (Role::Assistant, "r1"),
                (Role::User, "B"),
                (Role::Assistant, "r2"),
            ]
        );
    }

    // ── Mood tagging ──

    #[tokio::test]
    async fn user_turns_carry_the_mood_assistant_turns_never_do() {
        let backend = Arc::new(MockChatBackend::always("I hear you."));
        let session = session_with(backend);

        let _ = session
            .send(
                "it's been a lot",
                Some(FacialExpression::Sad),
                Some(VocalTone::Anxious),
            )
            .await
            .unwrap();

        let messages = session.messages();
        assert_eq!(
            messages[0].mood,
            Some(Mood::new(
                Some(FacialExpression::Sad),
                Some(VocalTone::Anxious)
            ))
        );
        assert!(messages[1].mood.is_none());
    }

    #[tokio::test]
    async fn absent_verdicts_leave_the_user_turn_untagged() {
        let backend = Arc::new(MockChatBackend::always("hi"));
        let session = session_with(backend);

        let _ = session.send("hello", None, None).await.unwrap();
        assert!(session.messages()[0].mood.is_none());
    }

    // ── Prompt wiring ──

    #[tokio::test]
    async fn the_prompt_sees_history_from_before_the_turn() {
        let backend = Arc::new(MockChatBackend::scripted(vec![
            Ok(ChatReply::assistant("r1")),
            Ok(ChatReply::assistant("r2")),
        ]));
        let session = session_with(Arc::clone(&backend));

        let _ = session.send("first", None, None).await.unwrap();
        let _ = session.send("second", None, None).await.unwrap();

        let prompts = backend.prompts();
        assert!(prompts[0].ends_with("USER: first\nASSISTANT:"));
        assert!(!prompts[0].contains("r1"));

        // Second prompt: history holds turn one, newest first, and the
        // new message appears only in its own final segment.
        assert!(prompts[1].contains("ASSISTANT: r1\nUSER: first"));
        assert!(prompts[1].ends_with("USER: second\nASSISTANT:"));
        assert_eq!(prompts[1].matches("USER: second").count(), 1);
    }

    #[tokio::test]
    async fn age_group_changes_apply_from_the_next_send() {
        let backend = Arc::new(MockChatBackend::always("ok"));
        let session = session_with(Arc::clone(&backend));
        assert_eq!(session.age_group(), AgeGroup::Adults);

        let _ = session.send("one", None, None).await.unwrap();
        session.set_age_group(AgeGroup::Children);
        let _ = session.send("two", None, None).await.unwrap();

        let prompts = backend.prompts();
        assert!(!prompts[0].contains(CHILDREN_MODIFIER));
        assert!(prompts[1].contains(CHILDREN_MODIFIER));
        assert_eq!(session.age_group(), AgeGroup::Children);
    }

    #[tokio::test]
    async fn send_verdicts_annotate_the_prompt() {
        let backend = Arc::new(MockChatBackend::always("ok"));
        let session = session_with(Arc::clone(&backend));

        let _ = session
            .send("hey", Some(FacialExpression::Happy), None)
            .await
            .unwrap();
        assert!(
            backend
                .last_prompt()
                .unwrap()
                .contains("reads as happy")
        );
    }

    // ── Fallback behavior ──

    #[tokio::test]
    async fn a_failed_completion_still_completes_the_turn() {
        let backend = Arc::new(MockChatBackend::scripted(vec![Err(
            CompletionError::Unavailable("connection refused".into()),
        )]));
        let session = session_with(backend);

        let reply = session.send("anyone there?", None, None).await.unwrap();
        assert_eq!(reply.content, FALLBACK_REPLY);
        assert_eq!(session.message_count(), 2);
        assert!(!session.is_processing());
    }

    // ── Events ──

    #[tokio::test]
    async fn one_turn_emits_the_full_event_sequence() {
        let backend = Arc::new(MockChatBackend::always("hello"));
        let emitter = Arc::new(EventEmitter::new());
        let mut rx = emitter.subscribe();
        let session = ConversationSession::new(CompletionClient::new(backend), emitter);

        let _ = session.send("hi", None, None).await.unwrap();

        let mut types = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => types.push(event.event_type()),
                Err(TryRecvError::Empty) => break,
                Err(error) => panic!("event stream broke: {error}"),
            }
        }
        assert_eq!(
            types,
            vec![
                "session_start",
                "turn_start",
                "message_appended",
                "message_appended",
                "turn_end",
            ]
        );
    }

    #[tokio::test]
    async fn turn_numbers_increase_across_sends() {
        let backend = Arc::new(MockChatBackend::always("ok"));
        let emitter = Arc::new(EventEmitter::new());
        let mut rx = emitter.subscribe();
        let session = ConversationSession::new(CompletionClient::new(backend), emitter);

        let _ = session.send("one", None, None).await.unwrap();
        let _ = session.send("two", None, None).await.unwrap();

        let mut turn_starts = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::TurnStart { turn, .. } = event {
                turn_starts.push(turn);
            }
        }
        assert_eq!(turn_starts, vec![1, 2]);
    }

    // ── Housekeeping ──

    #[tokio::test]
    async fn clear_messages_starts_the_conversation_over() {
        let backend = Arc::new(MockChatBackend::always("ok"));
        let session = session_with(backend);

        let _ = session.send("hello", None, None).await.unwrap();
        assert_eq!(session.message_count(), 2);

        session.clear_messages();
        assert_eq!(session.message_count(), 0);
        assert!(session.messages().is_empty());
    }

    #[tokio::test]
    async fn sessions_get_distinct_ids() {
        let a = session_with(Arc::new(MockChatBackend::always("x")));
        let b = session_with(Arc::new(MockChatBackend::always("x")));
        assert_ne!(a.id(), b.id());
    }
}
