//! Proposer capability trait and the always-pass implementation.
//!
//! On every turn the engine shows each seated player the current history
//! and asks for at most one item. The [`Proposer`] trait abstracts how that
//! answer is produced: a search-based strategy, a random bot, a scripted
//! test double. Proposers receive the history by shared reference and can
//! never mutate it.
//!
//! Randomised proposers draw from the engine's own generator, which is lent
//! to them for the duration of the call. This keeps a whole game a pure
//! function of the seed.

use discourse_types::{Item, Turn};
use rand::rngs::StdRng;

/// The single random number generator driving a game.
pub type GameRng = StdRng;

/// A seated player's decision procedure.
pub trait Proposer {
    /// Human-readable label for logs and score tables.
    fn name(&self) -> &str;

    /// Propose an item from this player's memory bank, or `None` to pass.
    ///
    /// Proposing an item the player does not own is not an error: the engine
    /// treats it as a pass.
    fn propose(&mut self, history: &[Turn], rng: &mut GameRng) -> Option<Item>;
}

/// A proposer that always passes.
#[derive(Debug, Clone, Default)]
pub struct PassProposer;

impl PassProposer {
    /// Create a new pass proposer.
    pub const fn new() -> Self {
        Self
    }
}

impl Proposer for PassProposer {
    fn name(&self) -> &str {
        "pass"
    }

    fn propose(&mut self, _history: &[Turn], _rng: &mut GameRng) -> Option<Item> {
        None
    }
}
