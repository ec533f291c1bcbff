//! Shared type definitions for the Discourse conversation game.
//!
//! This crate is the single source of truth for the data exchanged between
//! the engine, the agents, and any spectator. It holds no game logic.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for players and items
//! - [`structs`] -- Items, subjects, player snapshots, game context
//! - [`results`] -- Turn, score, and run records

pub mod ids;
pub mod results;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use ids::{ItemId, PlayerId};
pub use results::{
    EndReason, FinalScores, PlayerScore, Proposal, RunResult, ScoreBreakdown, TurnImpact,
    TurnResult,
};
pub use structs::{GameContext, Item, PlayerSnapshot, Subject, Subjects, Turn};
