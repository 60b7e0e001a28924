//! Conversation message types.
//!
//! A [`Message`] is one turn of the conversation. User turns may carry a
//! [`Mood`], the stabilized affect observed at send time. Assistant turns
//! are never mood-tagged. Messages are immutable once created; the session
//! owns them as an append-only list.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::affect::{FacialExpression, VocalTone};
use crate::ids::MessageId;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person seeking support.
    User,
    /// The companion's reply.
    Assistant,
}

impl Role {
    /// Uppercase marker used when rendering prompt transcripts.
    #[must_use]
    pub fn prompt_marker(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
        }
    }
}

/// Declared age bracket of the person in the conversation. Drives the
/// tone modifier in prompt assembly; adults are the unmodified baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    /// Young children.
    Children,
    /// Teenagers.
    Teenagers,
    /// Adults (baseline, no modifier).
    #[default]
    Adults,
}

/// Error parsing an [`AgeGroup`] from text.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown age group {value:?} (expected children, teenagers, or adults)")]
pub struct ParseAgeGroupError {
    /// The rejected input.
    pub value: String,
}

impl AgeGroup {
    /// Every age bracket.
    pub const ALL: [Self; 3] = [Self::Children, Self::Teenagers, Self::Adults];

    /// Canonical lowercase name, matching the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Children => "children",
            Self::Teenagers => "teenagers",
            Self::Adults => "adults",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeGroup {
    type Err = ParseAgeGroupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|group| group.as_str() == s)
            .ok_or_else(|| ParseAgeGroupError {
                value: s.to_string(),
            })
    }
}

/// Stabilized affect captured alongside a user turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mood {
    /// Stable facial expression at send time, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<FacialExpression>,
    /// Stable vocal tone at send time, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<VocalTone>,
}

impl Mood {
    /// Build a mood from whichever signals were available.
    #[must_use]
    pub fn new(emotion: Option<FacialExpression>, tone: Option<VocalTone>) -> Self {
        Self { emotion, tone }
    }

    /// True when neither modality produced a verdict.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emotion.is_none() && self.tone.is_none()
    }
}

/// A single conversation turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique, time-ordered identifier.
    pub id: MessageId,
    /// Author of the turn.
    pub role: Role,
    /// Verbatim text content.
    pub content: String,
    /// Affect hints recorded at send time. User turns only; an all-empty
    /// mood is stored as `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build an untagged user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content: content.into(),
            mood: None,
            timestamp: Utc::now(),
        }
    }

    /// Build a user turn carrying stabilized affect hints.
    ///
    /// A mood with no signals collapses to no tag at all.
    #[must_use]
    pub fn user_with_mood(content: impl Into<String>, mood: Mood) -> Self {
        Self {
            mood: (!mood.is_empty()).then_some(mood),
            ..Self::user(content)
        }
    }

    /// Build an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content: content.into(),
            mood: None,
            timestamp: Utc::now(),
        }
    }
}
