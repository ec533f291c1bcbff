//! Turn callback that narrates the conversation through `tracing`.

use discourse_core::Engine;
use discourse_core::runner::TurnCallback;
use discourse_types::{PlayerId, TurnResult};
use tracing::{debug, info};

/// Logs every turn, and the item and score effect when someone spoke.
pub struct TurnLog {
    names: Vec<(PlayerId, String)>,
}

impl TurnLog {
    /// Create a logger that labels speakers with the seated agent names.
    pub fn new(engine: &Engine) -> Self {
        let names = engine
            .snapshots()
            .iter()
            .map(|snapshot| snapshot.id)
            .zip(engine.player_names())
            .collect();
        Self { names }
    }

    fn name_of(&self, id: PlayerId) -> &str {
        self.names
            .iter()
            .find(|(player, _)| *player == id)
            .map_or("?", |(_, name)| name.as_str())
    }
}

impl TurnCallback for TurnLog {
    fn on_turn(&mut self, result: &TurnResult, engine: &Engine) {
        debug!(
            turn = result.turn,
            proposals = result.proposals.len(),
            rejected = result.rejected.len(),
            "Turn resolved"
        );

        match (result.speaker_id, result.item, &result.impact) {
            (Some(speaker), Some(item), Some(impact)) => info!(
                turn = result.turn,
                speaker = self.name_of(speaker),
                item = %item.id,
                importance = item.importance,
                shared = impact.breakdown.total(),
                individual = impact.individual,
                "Spoke"
            ),
            _ => info!(
                turn = result.turn,
                pause_streak = result.pause_streak,
                "Pause"
            ),
        }

        if let Some(reason) = result.end_reason {
            info!(turn = engine.turn(), ?reason, "Conversation over");
        }
    }
}
