//! Scoring rules, turn engine, and conversation runner for the Discourse game.
//!
//! This crate owns the authoritative game: the windowed scoring rules every
//! participant must agree on, the turn state machine with its
//! speaker-selection protocol, and the loop that plays a conversation to the
//! end.
//!
//! # Modules
//!
//! - [`clock`] -- Turn counter, pause streak, and termination.
//! - [`config`] -- Configuration loading from `discourse-config.yaml` into
//!   strongly-typed structs.
//! - [`decision`] -- [`Proposer`] trait and [`PassProposer`].
//! - [`engine`] -- The turn state machine and final scoring.
//! - [`runner`] -- Conversation loop with per-turn callbacks.
//! - [`scorer`] -- Hypothetical-move evaluator for lookahead strategies.
//! - [`scoring`] -- Canonical windowed scoring rules.
//! - [`setup`] -- Setup validation and random dealing of player snapshots.
//!
//! [`Proposer`]: decision::Proposer
//! [`PassProposer`]: decision::PassProposer

pub mod clock;
pub mod config;
pub mod decision;
pub mod engine;
pub mod runner;
pub mod scorer;
pub mod scoring;
pub mod setup;

pub use decision::{GameRng, Proposer};
pub use engine::{Engine, EngineError};
pub use scorer::Scorer;
