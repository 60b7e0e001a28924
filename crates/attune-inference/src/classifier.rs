//! Classifier boundary types, traits, and scripted mocks.
//!
//! The engine treats classifiers as black boxes: frames and utterance
//! audio go in, labeled detections come out. Real implementations wrap
//! on-device models on the capture side; the mocks here replay scripts
//! for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use attune_core::affect::{Detection, FacialExpression, VocalTone};

use crate::errors::InferenceError;

/// One captured video frame. The engine never inspects pixel content.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Raw pixel bytes in whatever layout the classifier expects.
    pub data: Vec<u8>,
}

impl Frame {
    /// Frame with explicit contents.
    #[must_use]
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
        }
    }

    /// Zero-sized placeholder, for classifiers that ignore pixel content
    /// (mocks, warm-up probes).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Finalized utterance audio, delivered by the capture side once its
/// silence threshold decides the utterance is over.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UtteranceAudio {
    /// Encoded audio bytes.
    pub data: Vec<u8>,
    /// MIME type of `data`, e.g. `audio/webm`.
    pub mime_type: String,
}

/// What vocal analysis extracts from one utterance.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Utterance {
    /// Finalized transcript text. May be empty when nothing was said.
    pub transcript: String,
    /// Tone read with confidence, when the analyzer produced one.
    pub tone: Option<Detection<VocalTone>>,
}

/// Facial-expression classification over single frames.
///
/// `Ok(None)` means no face was found; the caller must not emit a sample
/// for that frame.
#[async_trait]
pub trait FacialClassifier: Send + Sync {
    /// Classify one frame.
    async fn detect(
        &self,
        frame: &Frame,
    ) -> Result<Option<Detection<FacialExpression>>, InferenceError>;
}

/// Transcription plus tone analysis over finalized utterances.
#[async_trait]
pub trait VocalAnalyzer: Send + Sync {
    /// Analyze one utterance.
    async fn analyze(&self, audio: &UtteranceAudio) -> Result<Utterance, InferenceError>;
}

/// Scripted facial classifier for tests and offline runs.
///
/// Replays its steps in order; once the script is exhausted it reports
/// the fallback (no face, unless built with [`always`](Self::always)).
pub struct MockFacialClassifier {
    script: Mutex<VecDeque<Result<Option<Detection<FacialExpression>>, InferenceError>>>,
    fallback: Option<Detection<FacialExpression>>,
    calls: AtomicUsize,
}

impl MockFacialClassifier {
    /// Classifier that replays `steps` in order, then reports no face.
    #[must_use]
    pub fn scripted(
        steps: Vec<Result<Option<Detection<FacialExpression>>, InferenceError>>,
    ) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Classifier that reports the same detection on every frame.
    #[must_use]
    pub fn always(label: FacialExpression, confidence: f32) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(Detection::new(label, confidence)),
            calls: AtomicUsize::new(0),
        }
    }

    /// Classifier that never finds a face.
    #[must_use]
    pub fn blank() -> Self {
        Self::scripted(Vec::new())
    }

    /// Number of frames classified so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FacialClassifier for MockFacialClassifier {
    async fn detect(
        &self,
        _frame: &Frame,
    ) -> Result<Option<Detection<FacialExpression>>, InferenceError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(step) => step,
            None => Ok(self.fallback),
        }
    }
}

/// Scripted vocal analyzer for tests and offline runs.
///
/// Replays its steps in order; once exhausted it reports an empty
/// transcript with no tone.
pub struct MockVocalAnalyzer {
    script: Mutex<VecDeque<Result<Utterance, InferenceError>>>,
    calls: AtomicUsize,
}

impl MockVocalAnalyzer {
    /// Analyzer that replays `steps` in order.
    #[must_use]
    pub fn scripted(steps: Vec<Result<Utterance, InferenceError>>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of utterances analyzed so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VocalAnalyzer for MockVocalAnalyzer {
    async fn analyze(&self, _audio: &UtteranceAudio) -> Result<Utterance, InferenceError> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(step) => step,
            None => Ok(Utterance::default()),
        }
    }
}
