//! # attune-inference
//!
//! The inference boundary: backend identity and lifecycle, plus the
//! classifier contracts the capture side implements.
//!
//! - **[`ModelLifecycleManager`]**: lazy single-flight loads, latched
//!   failure, graceful degradation when a backend never comes up
//! - **[`BackendLoader`]**: the seam where applications put slow load
//!   work (weight fetches, warm-up passes, remote health probes)
//! - **[`FacialClassifier`] / [`VocalAnalyzer`]**: black-box classifier
//!   traits with scripted mocks for tests and offline runs
//!
//! ## Crate Position
//!
//! Depends only on `attune-core`. `attune-session` drives these traits
//! to feed the signal stabilizers; the binary provides real
//! implementations.

#![deny(unsafe_code)]

pub mod backend;
pub mod classifier;
pub mod errors;
pub mod lifecycle;

pub use backend::{BackendId, BackendLoader, BackendState, LoadOutcome};
pub use classifier::{
    FacialClassifier, Frame, MockFacialClassifier, MockVocalAnalyzer, Utterance, UtteranceAudio,
    VocalAnalyzer,
};
pub use errors::InferenceError;
pub use lifecycle::ModelLifecycleManager;
