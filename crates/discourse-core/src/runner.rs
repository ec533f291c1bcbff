//! Conversation loop runner.
//!
//! [`run_conversation`] drives [`Engine::step`] until the conversation ends,
//! handing every [`TurnResult`] to a [`TurnCallback`] (a spectator, a
//! recorder, or [`NoOpCallback`]) and then packages the final history and
//! canonical scores into a [`RunResult`].

use discourse_types::{RunResult, TurnResult};
use tracing::info;

use crate::engine::Engine;

/// Callback invoked after each turn.
///
/// Implementations can use this to render the conversation, export turn
/// records, etc. The callback receives the turn result and the engine state
/// after the turn was applied.
pub trait TurnCallback {
    /// Called after a turn completes.
    fn on_turn(&mut self, result: &TurnResult, engine: &Engine);
}

/// A no-op turn callback.
pub struct NoOpCallback;

impl TurnCallback for NoOpCallback {
    fn on_turn(&mut self, _result: &TurnResult, _engine: &Engine) {}
}

/// Step `engine` until the conversation ends and return the full result.
///
/// An engine without seated agents plays three pauses and stops.
pub fn run_conversation(engine: &mut Engine, callback: &mut dyn TurnCallback) -> RunResult {
    info!(
        players = engine.context().number_of_players,
        conversation_length = engine.context().conversation_length,
        "Conversation starting"
    );

    while let Some(result) = engine.step() {
        callback.on_turn(&result, engine);
    }

    let scores = engine.final_scores();
    RunResult {
        history: engine.history().to_vec(),
        turn_impact: engine.turn_impact().to_vec(),
        score_breakdown: scores.shared_score_breakdown,
        scores,
    }
}

/// Emit the end-of-conversation summary.
pub fn log_conversation_end(result: &RunResult) {
    let breakdown = &result.score_breakdown;
    info!(
        turns = result.history.len(),
        pauses = result.scores.pauses,
        shared = breakdown.total(),
        importance = breakdown.importance,
        coherence = breakdown.coherence,
        freshness = breakdown.freshness,
        nonmonotonousness = breakdown.nonmonotonousness,
        "Conversation summary"
    );
    for line in &result.scores.player_scores {
        info!(
            player = %line.player_id,
            name = %line.name,
            total = line.total,
            individual = line.individual,
            contributions = line.contributions,
            "Player score"
        );
    }
}
