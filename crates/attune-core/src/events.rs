//! Session lifecycle and affect events.
//!
//! [`SessionEvent`]s are broadcast by the conversation session and the
//! affect samplers so observers (a chat surface, the statistics view) can
//! react without reaching into engine state. Serialized with a `type`
//! discriminator; affect labels ride in the merged facial vocabulary.

use serde::{Deserialize, Serialize};

use crate::affect::{FacialExpression, Modality};
use crate::messages::Message;

/// Common fields for all session events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    /// Session this event belongs to.
    pub session_id: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl BaseEvent {
    /// Create a new base event with the current UTC timestamp.
    #[must_use]
    pub fn now(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Events emitted by a conversation session and its affect samplers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// Session created and ready for its first turn.
    #[serde(rename = "session_start")]
    SessionStart {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
    },

    /// A turn was accepted and is being processed.
    #[serde(rename = "turn_start")]
    TurnStart {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// 1-based turn counter.
        turn: u32,
    },

    /// A message was appended to the history.
    #[serde(rename = "message_appended")]
    MessageAppended {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// The appended message.
        message: Message,
    },

    /// A turn completed (the fallback reply counts as completion).
    #[serde(rename = "turn_end")]
    TurnEnd {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// 1-based turn counter.
        turn: u32,
    },

    /// A modality's stable verdict changed.
    #[serde(rename = "affect_update")]
    AffectUpdate {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Modality that produced the verdict.
        modality: Modality,
        /// Verdict label, merged into the facial vocabulary.
        label: FacialExpression,
        /// Mean window confidence.
        confidence: f32,
    },

    /// A modality dropped back to "unknown" (window cleared or quorum lost).
    #[serde(rename = "affect_cleared")]
    AffectCleared {
        /// Base fields.
        #[serde(flatten)]
        base: BaseEvent,
        /// Modality whose verdict went away.
        modality: Modality,
    },
}

impl SessionEvent {
    /// Get the base event fields.
    #[must_use]
    pub fn base(&self) -> &BaseEvent {
        match self {
            Self::SessionStart { base }
            | Self::TurnStart { base, .. }
            | Self::MessageAppended { base, .. }
            | Self::TurnEnd { base, .. }
            | Self::AffectUpdate { base, .. }
            | Self::AffectCleared { base, .. } => base,
        }
    }

    /// Get the event type string (for type discrimination).
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionStart { .. } => "session_start",
            Self::TurnStart { .. } => "turn_start",
            Self::MessageAppended { .. } => "message_appended",
            Self::TurnEnd { .. } => "turn_end",
            Self::AffectUpdate { .. } => "affect_update",
            Self::AffectCleared { .. } => "affect_cleared",
        }
    }

    /// Get the session ID.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.base().session_id
    }
}
