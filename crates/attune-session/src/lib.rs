//! # attune-session
//!
//! The conversation runtime. Everything upstream is plumbing; this crate
//! is where a turn actually happens:
//!
//! - **[`ConversationSession`]**: ordered history behind a single-writer
//!   turn gate, with mood tagging and a guaranteed assistant reply
//! - **[`prompt::build_prompt`]**: deterministic prompt assembly from
//!   persona, age modifier, affect annotations, and recent history
//! - **[`AffectMonitor`]** with [`FacialSampler`] / [`VocalSampler`]:
//!   the loops that turn classifier output into stabilized signals
//! - **[`EventEmitter`]**: broadcast fan-out of session events for chat
//!   surfaces and the statistics view
//!
//! ## Crate Position
//!
//! Sits on top of `attune-affect`, `attune-inference`, and
//! `attune-completion`. The binary wires real backends in; tests drive
//! everything through the scripted mocks those crates ship.

#![deny(unsafe_code)]

pub mod errors;
pub mod events;
pub mod monitor;
pub mod prompt;
pub mod session;

pub use errors::SessionError;
pub use events::EventEmitter;
pub use monitor::{
    AffectMonitor, FacialSampler, FrameSource, MonitorConfig, UtteranceSource, VocalSampler,
};
pub use prompt::{PromptParams, build_prompt};
pub use session::ConversationSession;
