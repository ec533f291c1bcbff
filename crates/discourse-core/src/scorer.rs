//! Hypothetical-move evaluator used by lookahead strategies.
//!
//! A [`Scorer`] answers "what would saying this item here be worth to me?"
//! for an arbitrary history without touching the real game state. It applies
//! the same rules as the engine (see [`crate::scoring`]) with the candidate
//! appended at the end of the history, so coherence is past-only.

use discourse_types::{Item, ScoreBreakdown, Subject, Turn};

use crate::scoring::{self, COHERENCE_SPAN, CoherenceWindow};

/// Stateless utility function for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct Scorer {
    /// The player's preference ranking (index 0 is the favourite).
    preferences: Vec<Subject>,
    /// Weight of the individual bonus against the shared total, in `[0, 1]`.
    competition_rate: f64,
    /// Whether to credit the change a candidate causes to the two-sided
    /// coherence of the entries just before it.
    retroactive_coherence: bool,
}

impl Scorer {
    /// Create a scorer for a player with the given preferences.
    pub const fn new(preferences: Vec<Subject>, competition_rate: f64) -> Self {
        Self {
            preferences,
            competition_rate,
            retroactive_coherence: false,
        }
    }

    /// Enable or disable retroactive coherence credit.
    #[must_use]
    pub fn with_retroactive_coherence(mut self, enabled: bool) -> Self {
        self.retroactive_coherence = enabled;
        self
    }

    /// The preference ranking this scorer uses.
    pub fn preferences(&self) -> &[Subject] {
        &self.preferences
    }

    /// The configured competition rate.
    pub const fn competition_rate(&self) -> f64 {
        self.competition_rate
    }

    /// Individual preference bonus of `item` for this player.
    pub fn individual(&self, item: &Item) -> f64 {
        scoring::individual_bonus(item, &self.preferences)
    }

    /// Shared components of `item` appended to `history`.
    pub fn breakdown(&self, item: &Item, history: &[Turn]) -> ScoreBreakdown {
        let position = history.len();
        let mut breakdown =
            scoring::shared_breakdown(item, position, history, CoherenceWindow::PastOnly);
        if self.retroactive_coherence && !scoring::is_repeated(item, history) {
            breakdown.coherence += retroactive_delta(item, history);
        }
        breakdown
    }

    /// Shared total of `item` appended to `history`.
    pub fn shared(&self, item: &Item, history: &[Turn]) -> f64 {
        self.breakdown(item, history).total()
    }

    /// Weighted utility: `competition_rate * individual + (1 - competition_rate) * shared`.
    pub fn evaluate(&self, item: &Item, history: &[Turn]) -> f64 {
        let individual = self.individual(item);
        let shared = self.shared(item, history);
        self.competition_rate * individual + (1.0 - self.competition_rate) * shared
    }

    /// Utility of the entry at `position`, scored against the history before it.
    ///
    /// Returns `None` for a pause or an out-of-range position.
    pub fn evaluate_at(&self, history: &[Turn], position: usize) -> Option<f64> {
        let item = history.get(position).copied().flatten()?;
        let prefix = history.get(..position)?;
        Some(self.evaluate(&item, prefix))
    }

    /// Exponentially discounted average of the utilities realised over the
    /// last `context_length` turns.
    ///
    /// The most recent turn has weight 1 and each turn before it is worth
    /// `(1 - discount_rate)` times the next. Pauses are skipped but still age
    /// the turns before them. Returns 0 when nothing was said.
    pub fn expected_score(&self, history: &[Turn], context_length: usize, discount_rate: f64) -> f64 {
        let len = history.len();
        let start = len.saturating_sub(context_length);
        let base = (1.0 - discount_rate).clamp(0.0, 1.0);

        let mut weight_sum = 0.0;
        let mut weighted_score_sum = 0.0;
        for position in start..len {
            let Some(score) = self.evaluate_at(history, position) else {
                continue;
            };
            let rank = len.saturating_sub(1).saturating_sub(position);
            let weight = base.powi(i32::try_from(rank).unwrap_or(i32::MAX));
            weight_sum += weight;
            weighted_score_sum += weight * score;
        }

        if weight_sum > 0.0 {
            weighted_score_sum / weight_sum
        } else {
            0.0
        }
    }
}

/// Change in the two-sided coherence of the entries just before the end of
/// `history` once `item` is appended.
fn retroactive_delta(item: &Item, history: &[Turn]) -> f64 {
    let position = history.len();
    let mut extended = history.to_vec();
    extended.push(Some(*item));

    let start = position.saturating_sub(COHERENCE_SPAN);
    (start..position)
        .filter_map(|i| {
            let earlier = history.get(i).copied().flatten()?;
            let after = scoring::coherence(&earlier, i, &extended, CoherenceWindow::TwoSided);
            let before = scoring::coherence(&earlier, i, history, CoherenceWindow::TwoSided);
            Some(after - before)
        })
        .sum()
}
