//! Speak-or-pass thresholds.
//!
//! A search-based agent only speaks when its best path score beats the
//! threshold. The threshold is either a constant or follows the conversation:
//! an exponential moving average of the utilities realised so far (from the
//! agent's own point of view), blended with a static baseline and capped.

use discourse_core::Scorer;
use discourse_types::Turn;

/// Look-back used when the discount rate is zero.
const UNDISCOUNTED_LOOKBACK: usize = 100;

/// How far back the EMA looks, as a multiple of `1 / discount_rate`.
const LOOKBACK_HORIZON: f64 = 10.0;

/// Decision threshold for search-based strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    /// A fixed value.
    Static(f64),
    /// An EMA of realised scores, see [`DynamicThreshold`].
    Dynamic(DynamicThreshold),
}

impl Threshold {
    /// The threshold for the next turn given `history`.
    pub fn resolve(&self, scorer: &Scorer, history: &[Turn]) -> f64 {
        match self {
            Self::Static(value) => *value,
            Self::Dynamic(dynamic) => dynamic.compute(scorer, history),
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self::Dynamic(DynamicThreshold::default())
    }
}

/// Parameters of the moving-average threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicThreshold {
    /// EMA weight of the newest score, in `[0, 1]`.
    pub discount_rate: f64,
    /// Value used when nothing has been said yet, and blended in always.
    pub static_baseline: f64,
    /// Share of the EMA in the blend, in `[0, 1]`.
    pub blend_factor: f64,
    /// Hard cap on the result.
    pub upper_bound: f64,
}

impl Default for DynamicThreshold {
    fn default() -> Self {
        Self {
            discount_rate: 0.12,
            static_baseline: 0.45,
            blend_factor: 0.6,
            upper_bound: 0.6,
        }
    }
}

impl DynamicThreshold {
    /// Number of most recent turns the EMA considers.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn lookback(&self) -> usize {
        if self.discount_rate <= 0.0 {
            return UNDISCOUNTED_LOOKBACK;
        }
        // Saturating float-to-int cast; the rate is positive here.
        (LOOKBACK_HORIZON / self.discount_rate).floor() as usize
    }

    /// `min(blend * ema + (1 - blend) * baseline, upper_bound)`.
    ///
    /// The EMA runs oldest to newest over the spoken turns in the look-back
    /// window, each scored by `scorer` against the history before it. It
    /// starts at the first such score and falls back to the baseline when
    /// the window holds only pauses.
    pub fn compute(&self, scorer: &Scorer, history: &[Turn]) -> f64 {
        let start = history.len().saturating_sub(self.lookback());
        let mut ema: Option<f64> = None;
        for position in start..history.len() {
            let Some(score) = scorer.evaluate_at(history, position) else {
                continue;
            };
            ema = Some(match ema {
                None => score,
                Some(previous) => {
                    self.discount_rate * score + (1.0 - self.discount_rate) * previous
                }
            });
        }

        let ema = ema.unwrap_or(self.static_baseline);
        let blended = self.blend_factor * ema + (1.0 - self.blend_factor) * self.static_baseline;
        blended.min(self.upper_bound)
    }
}
