//! # attune-core
//!
//! Foundation types and shared vocabulary for the Attune engine.
//!
//! This crate provides what every other attune crate depends on:
//!
//! - **Affect vocabulary**: [`affect::FacialExpression`] and
//!   [`affect::VocalTone`] closed label sets, the [`affect::AffectLabel`]
//!   bound, [`affect::Detection`] / [`affect::AffectSample`] /
//!   [`affect::StableAffect`], and the vocal→facial merge
//! - **Messages**: [`messages::Message`] with [`messages::Role`] and the
//!   optional per-turn [`messages::Mood`]
//! - **Branded IDs**: [`ids::MessageId`], [`ids::SessionId`] as UUID v7
//!   newtypes
//! - **Events**: [`events::SessionEvent`] for session lifecycle and affect
//!   updates
//! - **Logging**: [`logging::init`] for the tracing ecosystem
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other attune crates.

#![deny(unsafe_code)]

pub mod affect;
pub mod events;
pub mod ids;
pub mod logging;
pub mod messages;
