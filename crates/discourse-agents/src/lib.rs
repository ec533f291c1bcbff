//! Lookahead strategies for the Discourse game.
//!
//! This crate holds everything that decides what a player says. It sits on
//! top of `discourse-core`, which owns the rules, and only ever talks to the
//! engine through the [`Proposer`](discourse_core::Proposer) capability.
//!
//! # Modules
//!
//! - [`beam`] -- Beam-search construction and backward selection ([`BeamSearch`])
//! - [`error`] -- Errors raised while assembling a roster ([`AgentError`])
//! - [`presets`] -- Preset registry and [`build_roster`]
//! - [`strategy`] -- [`Strategy`] variants and the [`StrategyAgent`] wrapper
//! - [`threshold`] -- Static and moving-average speak thresholds
//! - [`tree`] -- Slab-backed [`BayesianTree`]

pub mod beam;
pub mod error;
pub mod presets;
pub mod strategy;
pub mod threshold;
pub mod tree;

pub use beam::{BeamConfig, BeamSearch, SearchOutcome};
pub use error::AgentError;
pub use presets::{PRESET_CODES, build_roster, preset};
pub use strategy::{BeamSearchParams, Strategy, StrategyAgent, Width};
pub use threshold::{DynamicThreshold, Threshold};
pub use tree::{BayesianTree, NodeId, SearchNode};
