//! Per-modality plumbing between the classifiers and the stabilizers.
//!
//! [`AffectMonitor`] owns one stabilization window and one recent-sample
//! log per modality. The samplers drive it: [`FacialSampler`] polls a
//! [`FrameSource`] on a fixed cadence, [`VocalSampler`] drains finalized
//! utterances from an [`UtteranceSource`]. Both wait for their backend to
//! load first and exit quietly when it never comes up, leaving that
//! modality at "unknown" for the whole session.
//!
//! Verdict changes are broadcast as `affect_update` / `affect_cleared`
//! events, with vocal labels merged into the facial vocabulary.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use attune_affect::{SampleLog, SignalStabilizer, StabilizerConfig};
use attune_core::affect::{
    AffectLabel, AffectSample, Detection, FacialExpression, Modality, StableAffect, VocalTone,
};
use attune_core::events::{BaseEvent, SessionEvent};
use attune_inference::{
    BackendId, FacialClassifier, Frame, ModelLifecycleManager, Utterance, UtteranceAudio,
    VocalAnalyzer,
};
use metrics::counter;
use parking_lot::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::events::EventEmitter;

/// Source of video frames for the facial sampler.
///
/// The capture side implements this; the engine never touches a camera.
/// `None` means capture has nothing right now (camera warming up, tab
/// hidden); the sampler skips the tick.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// The most recent frame, if one is available.
    async fn next_frame(&self) -> Option<Frame>;
}

/// Source of finalized utterances for the vocal sampler.
///
/// The capture side applies the silence threshold and hands over whole
/// utterances. `None` means the source is closed; the sampler stops.
#[async_trait]
pub trait UtteranceSource: Send + Sync {
    /// The next finalized utterance, or `None` once the source is closed.
    async fn next_utterance(&self) -> Option<UtteranceAudio>;
}

/// Tuning for the monitor's windows and sample logs.
#[derive(Clone, Copy, Debug)]
pub struct MonitorConfig {
    /// Stabilizer tuning, shared by both modalities.
    pub stabilizer: StabilizerConfig,
    /// Raw samples retained per modality for the statistics view.
    pub log_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stabilizer: StabilizerConfig::default(),
            log_capacity: 256,
        }
    }
}

struct ModalityState<L> {
    window: SignalStabilizer<L>,
    log: SampleLog<L>,
}

impl<L: AffectLabel> ModalityState<L> {
    fn new(config: MonitorConfig) -> Self {
        Self {
            window: SignalStabilizer::with_config(config.stabilizer),
            log: SampleLog::new(config.log_capacity),
        }
    }

    /// Push one sample; admitted samples are mirrored into the log.
    fn record(&mut self, sample: AffectSample<L>) {
        if self.window.push(sample) {
            counter!(
                "affect_samples_total",
                "modality" => L::MODALITY.as_str(),
                "outcome" => "admitted"
            )
            .increment(1);
            self.log.push(sample);
        } else {
            counter!(
                "affect_samples_total",
                "modality" => L::MODALITY.as_str(),
                "outcome" => "discarded"
            )
            .increment(1);
        }
    }
}

/// Stabilization windows and recent-sample logs for both modalities.
///
/// Interior-locked so the two samplers can record from separate tasks;
/// locks are never held across awaits.
pub struct AffectMonitor {
    facial: Mutex<ModalityState<FacialExpression>>,
    vocal: Mutex<ModalityState<VocalTone>>,
}

impl AffectMonitor {
    /// Monitor with the standard window tuning and 256-sample logs.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(MonitorConfig::default())
    }

    /// Monitor with explicit tuning.
    #[must_use]
    pub fn with_config(config: MonitorConfig) -> Self {
        Self {
            facial: Mutex::new(ModalityState::new(config)),
            vocal: Mutex::new(ModalityState::new(config)),
        }
    }

    /// Record one facial classification result and return the verdict.
    ///
    /// `None` means no face was found: nothing is pushed and the window
    /// is left exactly as it was. It is never folded into a "neutral"
    /// sample.
    pub fn record_facial(
        &self,
        detection: Option<Detection<FacialExpression>>,
    ) -> Option<StableAffect<FacialExpression>> {
        let mut state = self.facial.lock();
        if let Some(detection) = detection {
            state.record(detection.into_sample());
        }
        state.window.current()
    }

    /// Record the tone of one finalized utterance and return the verdict.
    ///
    /// Utterances without a tone read contribute nothing, same as a
    /// frame with no face.
    pub fn record_vocal(&self, utterance: &Utterance) -> Option<StableAffect<VocalTone>> {
        let mut state = self.vocal.lock();
        if let Some(detection) = utterance.tone {
            state.record(detection.into_sample());
        }
        state.window.current()
    }

    /// Current stable facial verdict, if quorum holds.
    #[must_use]
    pub fn current_expression(&self) -> Option<StableAffect<FacialExpression>> {
        self.facial.lock().window.current()
    }

    /// Current stable vocal verdict, if quorum holds.
    #[must_use]
    pub fn current_tone(&self) -> Option<StableAffect<VocalTone>> {
        self.vocal.lock().window.current()
    }

    /// Recent admitted facial samples, oldest first. Read-only view for
    /// the statistics side.
    #[must_use]
    pub fn recent_facial_samples(&self) -> Vec<AffectSample<FacialExpression>> {
        self.facial.lock().log.snapshot()
    }

    /// Recent admitted vocal samples, oldest first.
    #[must_use]
    pub fn recent_vocal_samples(&self) -> Vec<AffectSample<VocalTone>> {
        self.vocal.lock().log.snapshot()
    }

    /// Clear both windows; verdicts return to unknown. The sample logs
    /// are kept, the statistics view still wants the history.
    pub fn reset(&self) {
        self.facial.lock().window.clear();
        self.vocal.lock().window.clear();
    }
}

impl Default for AffectMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Emit `affect_update` / `affect_cleared` when the stable label moves.
/// Returns the label to diff against on the next call.
fn announce_verdict(
    emitter: &EventEmitter,
    session_id: &str,
    modality: Modality,
    previous: Option<FacialExpression>,
    verdict: Option<(FacialExpression, f32)>,
) -> Option<FacialExpression> {
    match verdict {
        Some((label, confidence)) => {
            if previous != Some(label) {
                let _ = emitter.emit(SessionEvent::AffectUpdate {
                    base: BaseEvent::now(session_id),
                    modality,
                    label,
                    confidence,
                });
            }
            Some(label)
        }
        None => {
            if previous.is_some() {
                let _ = emitter.emit(SessionEvent::AffectCleared {
                    base: BaseEvent::now(session_id),
                    modality,
                });
            }
            None
        }
    }
}

/// Polls a frame source at a fixed cadence and feeds the facial window.
pub struct FacialSampler {
    monitor: Arc<AffectMonitor>,
    lifecycle: ModelLifecycleManager,
    classifier: Arc<dyn FacialClassifier>,
    source: Arc<dyn FrameSource>,
    emitter: Arc<EventEmitter>,
    session_id: String,
    interval: Duration,
}

impl FacialSampler {
    /// Sampler classifying one frame from `source` every `interval`.
    pub fn new(
        monitor: Arc<AffectMonitor>,
        lifecycle: ModelLifecycleManager,
        classifier: Arc<dyn FacialClassifier>,
        source: Arc<dyn FrameSource>,
        emitter: Arc<EventEmitter>,
        session_id: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            monitor,
            lifecycle,
            classifier,
            source,
            emitter,
            session_id: session_id.into(),
            interval,
        }
    }

    /// Run until `shutdown` fires.
    ///
    /// Waits for the facial backend first; if the load fails the sampler
    /// exits quietly and the modality stays unknown. Classifier errors
    /// are logged and the frame skipped, never propagated.
    #[instrument(skip_all, fields(modality = %Modality::Facial))]
    pub async fn run(self, shutdown: CancellationToken) {
        if !self
            .lifecycle
            .ensure_loaded(BackendId::Facial)
            .await
            .is_ready()
        {
            warn!("facial backend failed to load, sampler not starting");
            return;
        }

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_label: Option<FacialExpression> = None;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("facial sampler stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let Some(frame) = self.source.next_frame().await else {
                continue;
            };
            let verdict = match self.classifier.detect(&frame).await {
                Ok(detection) => self.monitor.record_facial(detection),
                Err(error) => {
                    warn!(%error, "facial classifier errored, frame skipped");
                    continue;
                }
            };
            last_label = announce_verdict(
                &self.emitter,
                &self.session_id,
                Modality::Facial,
                last_label,
                verdict.map(|v| (v.label, v.confidence)),
            );
        }
    }
}

/// Drains finalized utterances and feeds the vocal window.
pub struct VocalSampler {
    monitor: Arc<AffectMonitor>,
    lifecycle: ModelLifecycleManager,
    analyzer: Arc<dyn VocalAnalyzer>,
    source: Arc<dyn UtteranceSource>,
    emitter: Arc<EventEmitter>,
    session_id: String,
}

impl VocalSampler {
    /// Sampler analyzing every utterance `source` yields.
    pub fn new(
        monitor: Arc<AffectMonitor>,
        lifecycle: ModelLifecycleManager,
        analyzer: Arc<dyn VocalAnalyzer>,
        source: Arc<dyn UtteranceSource>,
        emitter: Arc<EventEmitter>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            monitor,
            lifecycle,
            analyzer,
            source,
            emitter,
            session_id: session_id.into(),
        }
    }

    /// Run until `shutdown` fires or the source closes.
    ///
    /// Same degradation rules as the facial side. Verdicts enter the
    /// merged event stream through the vocal-to-facial label mapping.
    #[instrument(skip_all, fields(modality = %Modality::Vocal))]
    pub async fn run(self, shutdown: CancellationToken) {
        if !self
            .lifecycle
            .ensure_loaded(BackendId::Vocal)
            .await
            .is_ready()
        {
            warn!("vocal backend failed to load, sampler not starting");
            return;
        }

        let mut last_label: Option<FacialExpression> = None;

        loop {
            let audio = tokio::select! {
                () = shutdown.cancelled() => {
                    debug!("vocal sampler stopped");
                    return;
                }
                audio = self.source.next_utterance() => audio,
            };
            let Some(audio) = audio else {
                debug!("utterance source closed, vocal sampler stopped");
                return;
            };

            let verdict = match self.analyzer.analyze(&audio).await {
                Ok(utterance) => self.monitor.record_vocal(&utterance),
                Err(error) => {
                    warn!(%error, "vocal analyzer errored, utterance skipped");
                    continue;
                }
            };
            last_label = announce_verdict(
                &self.emitter,
                &self.session_id,
                Modality::Vocal,
                last_label,
                verdict.map(|v| (v.label.as_expression(), v.confidence)),
            );
        }
    }
}
