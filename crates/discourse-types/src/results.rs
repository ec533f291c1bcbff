//! Turn, score, and run records produced by the engine.
//!
//! These are the values spectators consume: a [`TurnResult`] per step, a
//! [`FinalScores`] table once the conversation ends, and a [`RunResult`]
//! bundling both with the final history.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use crate::ids::PlayerId;
use crate::structs::{Item, Turn};

/// The four shared score components for one item (or summed over many).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Item importance, 0 for a repeat.
    pub importance: f64,
    /// Window coherence in `{-1, 0, 1}` per item.
    pub coherence: f64,
    /// Post-pause novelty: count of fresh subjects.
    pub freshness: f64,
    /// `-1` for repeats and hot streaks, else 0.
    pub nonmonotonousness: f64,
}

impl ScoreBreakdown {
    /// Sum of all four components.
    pub fn total(&self) -> f64 {
        self.importance + self.coherence + self.freshness + self.nonmonotonousness
    }
}

impl AddAssign for ScoreBreakdown {
    fn add_assign(&mut self, rhs: Self) {
        self.importance += rhs.importance;
        self.coherence += rhs.coherence;
        self.freshness += rhs.freshness;
        self.nonmonotonousness += rhs.nonmonotonousness;
    }
}

/// The score effect of one spoken turn, computed against the history at the
/// moment it was spoken.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurnImpact {
    /// Who spoke.
    pub speaker_id: PlayerId,
    /// What was said.
    pub item: Item,
    /// Shared components at speaking time (coherence sees the past only).
    pub breakdown: ScoreBreakdown,
    /// Private preference bonus credited to the speaker.
    pub individual: f64,
}

/// A proposal that passed the ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// The proposing player.
    pub player_id: PlayerId,
    /// The proposed item.
    pub item: Item,
}

/// Why a conversation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    /// The history reached `conversation_length` turns.
    LengthReached,
    /// Three pauses in a row.
    PauseStreak,
}

/// Outcome of one engine step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    /// 1-based number of the turn just played.
    pub turn: usize,
    /// Valid proposals, in seating order.
    pub proposals: Vec<Proposal>,
    /// Players whose proposal was discarded as a contract violation.
    pub rejected: Vec<PlayerId>,
    /// The player given the floor, `None` on a pause.
    pub speaker_id: Option<PlayerId>,
    /// The item appended to history, `None` on a pause.
    pub item: Turn,
    /// Score effect of the spoken item, `None` on a pause.
    pub impact: Option<TurnImpact>,
    /// Consecutive pauses after this turn.
    pub pause_streak: usize,
    /// Set once this turn ended the conversation.
    pub end_reason: Option<EndReason>,
}

/// One player's line in the final table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    /// The player.
    pub player_id: PlayerId,
    /// Display name (strategy label).
    pub name: String,
    /// `(shared + individual) / conversation_length`.
    pub total: f64,
    /// Conversation-wide shared total (identical for every player).
    pub shared: f64,
    /// Accumulated private bonus.
    pub individual: f64,
    /// Number of items this player got to say.
    pub contributions: usize,
}

/// The canonical end-of-game scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalScores {
    /// Configured conversation length (the normaliser).
    pub conversation_length: usize,
    /// Number of pauses in the final history.
    pub pauses: usize,
    /// Per-player results, in seating order.
    pub player_scores: Vec<PlayerScore>,
    /// Shared components summed over the final history.
    pub shared_score_breakdown: ScoreBreakdown,
}

/// Everything a complete run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// The final history.
    pub history: Vec<Turn>,
    /// Per-turn impact, aligned with `history` (`None` for pauses).
    pub turn_impact: Vec<Option<TurnImpact>>,
    /// Shared components recomputed over the final history.
    pub score_breakdown: ScoreBreakdown,
    /// Final table.
    pub scores: FinalScores,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakdown_total_and_accumulate() {
        let mut acc = ScoreBreakdown::default();
        acc += ScoreBreakdown {
            importance: 0.5,
            coherence: -1.0,
            freshness: 2.0,
            nonmonotonousness: 0.0,
        };
        acc += ScoreBreakdown {
            importance: 0.25,
            coherence: 1.0,
            freshness: 0.0,
            nonmonotonousness: -1.0,
        };
        assert!((acc.total() - 1.75).abs() < 1e-12);
        assert!((acc.importance - 0.75).abs() < 1e-12);
    }
}
