//! Backend identity, observable load state, and the loader seam.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::InferenceError;

/// The inference backends the engine manages.
///
/// Each backend loads independently; a failure in one never blocks the
/// others.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendId {
    /// Facial-expression classifier over camera frames.
    Facial,
    /// Transcription plus tone analysis over finalized utterances.
    Vocal,
    /// Remote conversational completion endpoint.
    Chat,
}

impl BackendId {
    /// Every managed backend, in canonical order.
    pub const ALL: [Self; 3] = [Self::Facial, Self::Vocal, Self::Chat];

    /// Canonical lowercase name, matching the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Facial => "facial",
            Self::Vocal => "vocal",
            Self::Chat => "chat",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable load state of one backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendState {
    /// No load has been attempted yet.
    #[default]
    Unloaded,
    /// A load is in flight; new requests attach to it instead of starting
    /// another.
    Loading,
    /// Loaded and usable.
    Ready,
    /// The load failed. The backend stays disabled until an explicit
    /// [`reset`](crate::lifecycle::ModelLifecycleManager::reset).
    Failed,
}

impl BackendState {
    /// Canonical lowercase name, matching the serialized form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unloaded => "unloaded",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a load request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The backend is usable.
    Ready,
    /// The backend stays disabled; the session runs degraded without it.
    Failed,
}

impl LoadOutcome {
    /// True for [`LoadOutcome::Ready`].
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Performs the slow, run-once work of bringing a backend up.
///
/// Implementations live at the application boundary: weight downloads,
/// warm-up inference passes, remote health probes. The lifecycle manager
/// guarantees `load` runs at most once concurrently per backend, so
/// implementations need no deduplication of their own.
#[async_trait]
pub trait BackendLoader: Send + Sync {
    /// Bring `backend` up. An `Err` latches the backend as failed.
    async fn load(&self, backend: BackendId) -> Result<(), InferenceError>;
}
