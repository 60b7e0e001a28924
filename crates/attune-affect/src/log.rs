//! Bounded log of recently admitted samples.
//!
//! The statistics view reads raw affect history without owning it: writers
//! append, readers take a snapshot copy. Retention is capped so memory
//! stays flat however long a session runs.

use std::collections::VecDeque;

use attune_core::affect::{AffectLabel, AffectSample};

/// Append-only ring of the most recent samples for one modality.
#[derive(Debug)]
pub struct SampleLog<L> {
    entries: VecDeque<AffectSample<L>>,
    capacity: usize,
}

impl<L: AffectLabel> SampleLog<L> {
    /// Log retaining at most `capacity` samples.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest once full.
    pub fn push(&mut self, sample: AffectSample<L>) {
        if self.entries.len() >= self.capacity {
            let _ = self.entries.pop_front();
        }
        self.entries.push_back(sample);
    }

    /// Copy of the retained samples, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AffectSample<L>> {
        self.entries.iter().copied().collect()
    }

    /// Number of retained samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained samples.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use attune_core::affect::FacialExpression;

    use super::*;

    #[test]
    fn snapshot_is_oldest_first() {
        let mut log = SampleLog::new(8);
        log.push(AffectSample::new(FacialExpression::Sad, 0.4));
        log.push(AffectSample::new(FacialExpression::Happy, 0.9));

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].label, FacialExpression::Sad);
        assert_eq!(snapshot[1].label, FacialExpression::Happy);
    }

    #[test]
    fn eviction_keeps_the_newest() {
        let mut log = SampleLog::new(3);
        for confidence in [0.1, 0.2, 0.3, 0.4, 0.5] {
            log.push(AffectSample::new(FacialExpression::Neutral, confidence));
        }

        assert_eq!(log.len(), 3);
        let confidences: Vec<f32> = log.snapshot().iter().map(|s| s.confidence).collect();
        assert_eq!(confidences, vec![0.3, 0.4, 0.5]);
    }

    #[test]
    fn empty_log_reports_empty() {
        let log: SampleLog<FacialExpression> = SampleLog::new(4);
        assert!(log.is_empty());
        assert!(log.snapshot().is_empty());
        assert_eq!(log.capacity(), 4);
    }
}
