//! # attune-affect
//!
//! Affect signal stabilization.
//!
//! - **[`stabilizer::SignalStabilizer`]**: windowed majority voting with a
//!   confidence floor, quorum gating, and recency tie-breaking
//! - **[`log::SampleLog`]**: bounded recent-sample history backing the
//!   statistics view
//!
//! Both are pure in-memory structures over `attune-core` types: no I/O,
//! no async. One instance per modality; facial and vocal signals never
//! share a window.
//!
//! ## Crate Position
//!
//! Sits between the classifier boundary (`attune-inference`) and the
//! runtime wiring in `attune-session`, which owns one stabilizer and one
//! log per modality.

#![deny(unsafe_code)]

pub mod log;
pub mod stabilizer;

pub use log::SampleLog;
pub use stabilizer::{SignalStabilizer, StabilizerConfig};
