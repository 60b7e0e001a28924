//! Affect vocabulary shared across the engine.
//!
//! Two disjoint label sets, one per sensing modality:
//!
//! - [`FacialExpression`]: facial classifier output, one detection per
//!   analyzed video frame.
//! - [`VocalTone`]: vocal analyzer output, one detection per finalized
//!   utterance.
//!
//! [`VocalTone::as_expression`] merges the vocal vocabulary into the facial
//! one wherever the two modalities are displayed or counted together. Raw
//! [`Detection`]s become timestamped [`AffectSample`]s on admission; the
//! stabilizer reduces a window of samples to a [`StableAffect`] verdict.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Modality and the shared label bound
// ─────────────────────────────────────────────────────────────────────────────

/// Sensing channel a label or sample belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Facial-expression classification over video frames.
    Facial,
    /// Vocal-tone classification over finalized utterances.
    Vocal,
}

impl Modality {
    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Facial => "facial",
            Self::Vocal => "vocal",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bound shared by both label vocabularies.
///
/// The stabilizer and sample log are generic over this trait so facial and
/// vocal modalities run identical logic on independent windows.
pub trait AffectLabel:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Modality whose vocabulary this label belongs to.
    const MODALITY: Modality;

    /// Canonical lowercase name.
    fn as_str(&self) -> &'static str;
}

/// Error returned when parsing an affect label from text fails.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unrecognized {modality} label `{value}`")]
pub struct ParseLabelError {
    /// Vocabulary that was searched.
    pub modality: Modality,
    /// The rejected input.
    pub value: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Facial vocabulary
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of labels the facial classifier can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacialExpression {
    /// No pronounced expression.
    Neutral,
    /// Smiling, positive valence.
    Happy,
    /// Downcast, negative valence.
    Sad,
    /// Hostile or frustrated.
    Angry,
    /// Afraid or alarmed.
    Fearful,
    /// Repulsed.
    Disgusted,
    /// Startled, raised-brow.
    Surprised,
}

impl FacialExpression {
    /// Every label in the vocabulary, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Neutral,
        Self::Happy,
        Self::Sad,
        Self::Angry,
        Self::Fearful,
        Self::Disgusted,
        Self::Surprised,
    ];
}

impl AffectLabel for FacialExpression {
    const MODALITY: Modality = Modality::Facial;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fearful => "fearful",
            Self::Disgusted => "disgusted",
            Self::Surprised => "surprised",
        }
    }
}

impl fmt::Display for FacialExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacialExpression {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| ParseLabelError {
                modality: Modality::Facial,
                value: s.to_string(),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Vocal vocabulary
// ─────────────────────────────────────────────────────────────────────────────

/// Closed set of labels the vocal analyzer can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocalTone {
    /// Flat, unremarkable delivery.
    Neutral,
    /// Relaxed, even delivery.
    Calm,
    /// Energetic, elevated pitch.
    Excited,
    /// Subdued, low energy.
    Sad,
    /// Sharp or raised voice.
    Angry,
    /// Tense, strained delivery.
    Anxious,
    /// Hesitant, trailing delivery.
    Uncertain,
}

impl VocalTone {
    /// Every label in the vocabulary, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Neutral,
        Self::Calm,
        Self::Excited,
        Self::Sad,
        Self::Angry,
        Self::Anxious,
        Self::Uncertain,
    ];

    /// Merge into the facial vocabulary for display and statistics.
    ///
    /// `uncertain` carries no displayable emotion and folds to `neutral`.
    #[must_use]
    pub fn as_expression(self) -> FacialExpression {
        match self {
            Self::Neutral | Self::Calm | Self::Uncertain => FacialExpression::Neutral,
            Self::Excited => FacialExpression::Happy,
            Self::Sad => FacialExpression::Sad,
            Self::Angry => FacialExpression::Angry,
            Self::Anxious => FacialExpression::Fearful,
        }
    }
}

impl AffectLabel for VocalTone {
    const MODALITY: Modality = Modality::Vocal;

    fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Calm => "calm",
            Self::Excited => "excited",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Anxious => "anxious",
            Self::Uncertain => "uncertain",
        }
    }
}

impl fmt::Display for VocalTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VocalTone {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == s)
            .ok_or_else(|| ParseLabelError {
                modality: Modality::Vocal,
                value: s.to_string(),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Detections, samples, verdicts
// ─────────────────────────────────────────────────────────────────────────────

/// A single raw classifier output, before admission.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection<L> {
    /// Predicted label.
    pub label: L,
    /// Classifier certainty in `[0, 1]`.
    pub confidence: f32,
}

impl<L> Detection<L> {
    /// Build a detection.
    pub fn new(label: L, confidence: f32) -> Self {
        Self { label, confidence }
    }

    /// Stamp with the current time, producing an admissible sample.
    #[must_use]
    pub fn into_sample(self) -> AffectSample<L> {
        self.into_sample_at(Utc::now())
    }

    /// Stamp with an explicit capture time.
    #[must_use]
    pub fn into_sample_at(self, captured_at: DateTime<Utc>) -> AffectSample<L> {
        AffectSample {
            label: self.label,
            confidence: self.confidence,
            captured_at,
        }
    }
}

/// A timestamped affect observation.
///
/// Immutable once created and ephemeral; it lives only inside the bounded
/// stabilization window and the recent-sample log.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectSample<L> {
    /// Predicted label.
    pub label: L,
    /// Classifier certainty in `[0, 1]`.
    pub confidence: f32,
    /// Arrival time of the observation.
    pub captured_at: DateTime<Utc>,
}

impl<L> AffectSample<L> {
    /// Build a sample stamped with the current time.
    #[must_use]
    pub fn new(label: L, confidence: f32) -> Self {
        Self {
            label,
            confidence,
            captured_at: Utc::now(),
        }
    }
}

/// The stabilizer's debounced verdict for one modality.
///
/// Derived from the window on demand and never persisted. `confidence` is
/// the mean over every sample in the window, not only the winning label's,
/// so it reflects overall detector certainty.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StableAffect<L> {
    /// Majority label.
    pub label: L,
    /// Mean confidence across the whole window.
    pub confidence: f32,
}
