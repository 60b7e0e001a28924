//! # attune-completion
//!
//! Calls to the remote conversational service, made safe for an
//! emotional-support session:
//!
//! - **[`ChatBackend`]**: the service seam, with an HTTP implementation
//!   ([`HttpChatBackend`]) and a scripted mock ([`MockChatBackend`])
//! - **[`race_with_timeout`]**: race any future against a deadline; the
//!   loser is dropped, never awaited
//! - **[`CompletionClient`]**: one attempt per turn under a hard 15 s
//!   ceiling, with [`FALLBACK_REPLY`] substituted on any failure so the
//!   conversation never hard-fails
//!
//! ## Crate Position
//!
//! Stands alone below `attune-session`, which drives it once per user
//! turn. Depends on no other workspace crate.

#![deny(unsafe_code)]

pub mod backend;
pub mod client;
pub mod errors;
pub mod http;
pub mod timeout;

pub use backend::{ChatBackend, ChatReply, MockChatBackend};
pub use client::{CompletionClient, CompletionConfig, FALLBACK_REPLY};
pub use errors::CompletionError;
pub use http::HttpChatBackend;
pub use timeout::{TimedResult, race_with_timeout};
