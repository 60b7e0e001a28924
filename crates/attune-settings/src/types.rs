//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON
//! file format. Each type implements [`Default`] with production default
//! values; `#[serde(default)]` allows partial JSON, so missing fields get
//! their default value during deserialization.

use attune_core::messages::AgeGroup;
use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// Loaded from `~/.attune/settings.json` with defaults applied for
/// missing fields. Environment variables can override specific values.
///
/// # JSON Format
///
/// All field names are camelCase. Example:
///
/// ```json
/// {
///   "version": "0.1.0",
///   "affect": { "windowSize": 7 },
///   "completion": { "baseUrl": "http://10.0.0.5:8080" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttuneSettings {
    /// Settings schema version.
    pub version: String,
    /// Affect stabilization settings.
    pub affect: AffectSettings,
    /// Remote completion settings.
    pub completion: CompletionSettings,
    /// Conversation session settings.
    pub session: SessionSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for AttuneSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            affect: AffectSettings::default(),
            completion: CompletionSettings::default(),
            session: SessionSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AttuneSettings {
    /// Clamp out-of-range values and correct invalid invariants.
    ///
    /// Called automatically during loading. Bad values are corrected with
    /// a warning rather than rejected, so users get working behavior
    /// instead of a confusing startup error.
    pub fn validate(&mut self) {
        let affect = &mut self.affect;
        if affect.confidence_floor < 0.0 || affect.confidence_floor > 1.0 {
            let clamped = affect.confidence_floor.clamp(0.0, 1.0);
            tracing::warn!(
                "confidenceFloor out of range ({}), clamped to {clamped}",
                affect.confidence_floor
            );
            affect.confidence_floor = clamped;
        }
        if affect.window_size == 0 {
            tracing::warn!("windowSize must be nonzero, correcting to 5");
            affect.window_size = 5;
        }
        if affect.min_samples == 0 {
            tracing::warn!("minSamples must be nonzero, correcting to 1");
            affect.min_samples = 1;
        }
        if affect.min_samples > affect.window_size {
            tracing::warn!(
                "minSamples ({}) > windowSize ({}), correcting",
                affect.min_samples,
                affect.window_size
            );
            affect.min_samples = affect.window_size;
        }
        if affect.poll_interval_ms == 0 {
            tracing::warn!("pollIntervalMs must be nonzero, correcting to 500");
            affect.poll_interval_ms = 500;
        }
        if self.completion.timeout_ms == 0 {
            tracing::warn!("timeoutMs must be nonzero, correcting to 15000");
            self.completion.timeout_ms = 15_000;
        }
    }
}

/// Affect stabilization settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AffectSettings {
    /// Stabilization window capacity per modality.
    pub window_size: usize,
    /// Minimum admitted samples before a verdict can be emitted.
    pub min_samples: usize,
    /// Samples below this confidence are discarded (0.0 to 1.0).
    pub confidence_floor: f32,
    /// Facial sampler polling cadence in milliseconds.
    pub poll_interval_ms: u64,
    /// Bounded raw-sample history per modality for the statistics view.
    pub log_capacity: usize,
}

impl Default for AffectSettings {
    fn default() -> Self {
        Self {
            window_size: 5,
            min_samples: 3,
            confidence_floor: 0.2,
            poll_interval_ms: 500,
            log_capacity: 256,
        }
    }
}

/// Remote completion settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompletionSettings {
    /// Base URL of the conversational service.
    pub base_url: String,
    /// Hard ceiling on one completion call, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_ms: 15_000,
        }
    }
}

/// Conversation session settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Age bracket assumed until the user declares one.
    pub default_age_group: AgeGroup,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_age_group: AgeGroup::Adults,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default tracing filter when `ATTUNE_LOG`/`RUST_LOG` are unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
