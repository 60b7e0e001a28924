//! Windowed majority voting over raw affect samples.
//!
//! Per-frame classifier output is noisy: a single blink can read as
//! "surprised" and a compression artifact as "disgusted". The stabilizer
//! admits samples into a small FIFO window, gates out low-confidence
//! frames, and only reports a label once it holds a quorum of the window.
//! Until then the signal is *unknown*; callers must not substitute a
//! default label.

use std::collections::HashMap;
use std::collections::VecDeque;

use attune_core::affect::{AffectLabel, AffectSample, StableAffect};
use tracing::debug;

/// Tuning for one stabilization window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StabilizerConfig {
    /// Maximum samples retained; admitting past this evicts the oldest.
    pub capacity: usize,
    /// Admitted samples required before any verdict is emitted.
    pub min_samples: usize,
    /// Detections below this confidence are dropped, not stored.
    pub confidence_floor: f32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            min_samples: 3,
            confidence_floor: 0.2,
        }
    }
}

/// Debounces a stream of noisy detections into a stable verdict.
///
/// One instance per modality; facial and vocal windows never mix. The
/// algorithm is streaming: O(window) per operation, constant memory,
/// restartable via [`clear`](Self::clear).
#[derive(Debug)]
pub struct SignalStabilizer<L> {
    window: VecDeque<AffectSample<L>>,
    config: StabilizerConfig,
}

impl<L: AffectLabel> SignalStabilizer<L> {
    /// Stabilizer with the standard window (capacity 5, quorum from 3
    /// samples, 0.2 confidence floor).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StabilizerConfig::default())
    }

    /// Stabilizer with explicit tuning.
    #[must_use]
    pub fn with_config(config: StabilizerConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.capacity),
            config,
        }
    }

    /// Admit one sample. Returns whether it entered the window.
    ///
    /// Samples below the confidence floor contribute no signal and are
    /// silently discarded. Admitting past capacity evicts the oldest entry.
    pub fn push(&mut self, sample: AffectSample<L>) -> bool {
        if sample.confidence < self.config.confidence_floor {
            debug!(
                modality = %L::MODALITY,
                label = %sample.label,
                confidence = sample.confidence,
                "sample below confidence floor, dropped"
            );
            return false;
        }
        if self.window.len() >= self.config.capacity {
            let _ = self.window.pop_front();
        }
        self.window.push_back(sample);
        true
    }

    /// The current verdict, or `None` while the signal is unknown.
    ///
    /// Unknown until the window holds at least `min_samples` admitted
    /// samples and one label reaches quorum: count ≥ ceil(len/2) over the
    /// currently admitted count. Count ties go to the label seen most
    /// recently. The reported confidence is the arithmetic mean over every
    /// sample in the window, not only the winner's.
    #[must_use]
    pub fn current(&self) -> Option<StableAffect<L>> {
        if self.window.len() < self.config.min_samples {
            return None;
        }

        // Tally count and last-seen position per label, oldest to newest.
        let mut tallies: HashMap<L, (usize, usize)> = HashMap::new();
        for (position, sample) in self.window.iter().enumerate() {
            let entry = tallies.entry(sample.label).or_insert((0, 0));
            entry.0 += 1;
            entry.1 = position;
        }

        // Highest count wins; on a count tie the larger last-seen position
        // (the more recent occurrence) takes it.
        let (label, (count, _)) = tallies
            .into_iter()
            .max_by_key(|&(_, (count, last_seen))| (count, last_seen))?;

        let quorum = self.window.len().div_ceil(2);
        if count < quorum {
            return None;
        }

        let total: f32 = self.window.iter().map(|s| s.confidence).sum();
        Some(StableAffect {
            label,
            confidence: total / self.window.len() as f32,
        })
    }

    /// Forget every sample; the verdict returns to unknown.
    pub fn clear(&mut self) {
        self.window.clear();
    }

    /// Admitted samples currently in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// True when no samples have been admitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

impl<L: AffectLabel> Default for SignalStabilizer<L> {
    fn default() -> Self {
        Self::new()
    }
}
