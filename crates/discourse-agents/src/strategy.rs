//! Strategy variants and the agent that plays them.
//!
//! A [`Strategy`] is a plain description of how a seat decides: always pass,
//! babble at random, or search ahead and speak when the best line clears a
//! threshold. [`StrategyAgent`] binds one to a dealt [`PlayerSnapshot`] and
//! implements the engine's [`Proposer`] capability.

use discourse_core::{GameRng, Proposer, Scorer};
use discourse_types::{GameContext, Item, PlayerSnapshot, Turn};
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::debug;

use crate::beam::{BeamConfig, BeamSearch, DEFAULT_DECAY_RATE, DEFAULT_ROOT_PROBABILITY};
use crate::error::AgentError;
use crate::threshold::Threshold;

/// Chance that a random-pause agent speaks on a given turn.
pub const DEFAULT_SPEAK_PROBABILITY: f64 = 0.75;

/// Competition rate used when a strategy does not score anything.
const NEUTRAL_COMPETITION_RATE: f64 = 0.5;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Beam width, either absolute or relative to the memory bank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Width {
    /// A fixed number of nodes per level.
    Fixed(usize),
    /// A multiple of the memory bank size, rounded down.
    Rate(f64),
    /// Exactly the memory bank size.
    MemoryBank,
}

impl Width {
    /// Resolve against a memory bank of `bank_size` items. Never below 1.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn resolve(self, bank_size: usize) -> usize {
        let width = match self {
            Self::Fixed(width) => width,
            Self::Rate(rate) => (rate * bank_size as f64).floor() as usize,
            Self::MemoryBank => bank_size,
        };
        width.max(1)
    }
}

/// Lookahead parameters of a beam-search strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeamSearchParams {
    /// Levels to look ahead.
    pub depth: usize,
    /// Nodes kept per level.
    pub width: Width,
    /// Per-level probability attenuation.
    pub decay_rate: f64,
    /// Prior probability of the search root.
    pub root_probability: f64,
    /// Weight of the individual bonus against the shared score.
    pub competition_rate: f64,
    /// When the best line is good enough to speak.
    pub threshold: Threshold,
    /// Credit candidates with the coherence they add to earlier entries.
    pub retroactive_coherence: bool,
}

impl BeamSearchParams {
    /// Parameters with the usual decay, root prior, balanced competition,
    /// and a dynamic threshold.
    pub fn new(depth: usize, width: Width) -> Self {
        Self {
            depth,
            width,
            decay_rate: DEFAULT_DECAY_RATE,
            root_probability: DEFAULT_ROOT_PROBABILITY,
            competition_rate: NEUTRAL_COMPETITION_RATE,
            threshold: Threshold::default(),
            retroactive_coherence: false,
        }
    }

    fn beam_config(&self, bank_size: usize) -> BeamConfig {
        BeamConfig {
            depth: self.depth,
            width: self.width.resolve(bank_size),
            decay_rate: self.decay_rate,
            root_probability: self.root_probability,
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How a seat decides what to say.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    /// Always pass.
    Pause,
    /// Propose a uniformly random memory every turn.
    Random,
    /// Propose a random memory with the given probability, else pass.
    RandomPause {
        /// Probability of speaking, in `[0, 1]`.
        speak_probability: f64,
    },
    /// One-step lookahead over the whole memory bank.
    Greedy {
        /// Weight of the individual bonus against the shared score.
        competition_rate: f64,
        /// When the best item is good enough to speak.
        threshold: Threshold,
    },
    /// Multi-step beam search.
    BeamSearch(BeamSearchParams),
}

impl Strategy {
    /// Short label for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Random => "random",
            Self::RandomPause { .. } => "random_pause",
            Self::Greedy { .. } => "greedy",
            Self::BeamSearch(_) => "beam_search",
        }
    }

    /// The competition rate the strategy scores with, if it scores at all.
    pub const fn competition_rate(&self) -> Option<f64> {
        match self {
            Self::Greedy {
                competition_rate, ..
            } => Some(*competition_rate),
            Self::BeamSearch(params) => Some(params.competition_rate),
            Self::Pause | Self::Random | Self::RandomPause { .. } => None,
        }
    }

    /// Whether the strategy's scorer credits retroactive coherence.
    pub const fn retroactive_coherence(&self) -> bool {
        match self {
            Self::BeamSearch(params) => params.retroactive_coherence,
            Self::Pause | Self::Random | Self::RandomPause { .. } | Self::Greedy { .. } => false,
        }
    }

    /// Check every parameter range.
    pub fn validate(&self) -> Result<(), AgentError> {
        match self {
            Self::Pause | Self::Random => Ok(()),
            Self::RandomPause { speak_probability } => {
                unit_interval("speak_probability", *speak_probability)
            }
            Self::Greedy {
                competition_rate,
                threshold,
            } => {
                unit_interval("competition_rate", *competition_rate)?;
                validate_threshold(threshold)
            }
            Self::BeamSearch(params) => {
                if params.depth == 0 {
                    return Err(AgentError::InvalidParameter {
                        name: "depth",
                        reason: String::from("must be at least 1"),
                    });
                }
                if let Width::Rate(rate) = params.width {
                    if !rate.is_finite() || rate < 0.0 {
                        return Err(AgentError::InvalidParameter {
                            name: "width",
                            reason: format!("rate must be finite and non-negative, got {rate}"),
                        });
                    }
                }
                unit_interval("decay_rate", params.decay_rate)?;
                if !params.root_probability.is_finite() || params.root_probability <= 0.0 {
                    return Err(AgentError::InvalidParameter {
                        name: "root_probability",
                        reason: format!("must be positive, got {}", params.root_probability),
                    });
                }
                unit_interval("competition_rate", params.competition_rate)?;
                validate_threshold(&params.threshold)
            }
        }
    }
}

fn unit_interval(name: &'static str, value: f64) -> Result<(), AgentError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AgentError::InvalidParameter {
            name,
            reason: format!("must be in [0, 1], got {value}"),
        })
    }
}

fn validate_threshold(threshold: &Threshold) -> Result<(), AgentError> {
    match threshold {
        Threshold::Static(value) if !value.is_finite() => Err(AgentError::InvalidParameter {
            name: "threshold",
            reason: format!("must be finite, got {value}"),
        }),
        Threshold::Static(_) => Ok(()),
        Threshold::Dynamic(dynamic) => {
            unit_interval("discount_rate", dynamic.discount_rate)?;
            unit_interval("blend_factor", dynamic.blend_factor)
        }
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// A seated player driven by a [`Strategy`].
#[derive(Debug, Clone)]
pub struct StrategyAgent {
    name: String,
    snapshot: PlayerSnapshot,
    context: GameContext,
    strategy: Strategy,
    scorer: Scorer,
}

impl StrategyAgent {
    /// Bind `strategy` to a dealt player.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidParameter`] if a strategy parameter is
    /// out of range.
    pub fn new(
        name: impl Into<String>,
        snapshot: PlayerSnapshot,
        context: GameContext,
        strategy: Strategy,
    ) -> Result<Self, AgentError> {
        strategy.validate()?;
        let scorer = Scorer::new(
            snapshot.preferences.clone(),
            strategy
                .competition_rate()
                .unwrap_or(NEUTRAL_COMPETITION_RATE),
        )
        .with_retroactive_coherence(strategy.retroactive_coherence());
        Ok(Self {
            name: name.into(),
            snapshot,
            context,
            strategy,
            scorer,
        })
    }

    /// The dealt player this agent plays.
    pub const fn snapshot(&self) -> &PlayerSnapshot {
        &self.snapshot
    }

    /// The game this agent was seated in.
    pub const fn context(&self) -> GameContext {
        self.context
    }

    /// The strategy in use.
    pub const fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    /// The agent's evaluator.
    pub const fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    fn random_memory(&self, rng: &mut GameRng) -> Option<Item> {
        self.snapshot.memory_bank.choose(rng).copied()
    }

    /// Search, then speak only if the best line beats the threshold.
    fn deliberate(&self, beam: BeamConfig, threshold: Threshold, history: &[Turn]) -> Option<Item> {
        let outcome = BeamSearch::new(&self.scorer, beam).search(&self.snapshot.memory_bank, history);
        let bar = threshold.resolve(&self.scorer, history);
        let speaks = outcome.item.is_some() && outcome.score > bar;
        debug!(
            player = %self.name,
            strategy = self.strategy.kind(),
            score = outcome.score,
            threshold = bar,
            speaks,
            "Deliberation"
        );
        if speaks { outcome.item } else { None }
    }
}

impl Proposer for StrategyAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(&mut self, history: &[Turn], rng: &mut GameRng) -> Option<Item> {
        match self.strategy {
            Strategy::Pause => None,
            Strategy::Random => self.random_memory(rng),
            Strategy::RandomPause { speak_probability } => {
                if rng.random_bool(speak_probability) {
                    self.random_memory(rng)
                } else {
                    None
                }
            }
            Strategy::Greedy { threshold, .. } => {
                let beam = BeamConfig {
                    depth: 1,
                    width: Width::MemoryBank.resolve(self.snapshot.memory_bank.len()),
                    ..BeamConfig::default()
                };
                self.deliberate(beam, threshold, history)
            }
            Strategy::BeamSearch(params) => {
                let beam = params.beam_config(self.snapshot.memory_bank.len());
                self.deliberate(beam, params.threshold, history)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use discourse_types::{ItemId, PlayerId, Subjects};
    use rand::SeedableRng;

    use super::*;

    fn snapshot(importances: &[f64]) -> PlayerSnapshot {
        let owner = PlayerId::from_random_bytes([7; 16]);
        let memory_bank = importances
            .iter()
            .zip(0_u8..)
            .map(|(&importance, tag)| Item {
                id: ItemId::from_random_bytes([tag; 16]),
                player_id: owner,
                importance,
                subjects: Subjects::one(u32::from(tag)),
            })
            .collect();
        PlayerSnapshot {
            id: owner,
            preferences: (0..10).collect(),
            memory_bank,
        }
    }

    fn context() -> GameContext {
        GameContext {
            number_of_players: 2,
            conversation_length: 10,
        }
    }

    #[test]
    fn width_rate_floors_with_minimum_one() {
        assert_eq!(Width::Rate(0.5).resolve(10), 5);
        assert_eq!(Width::Rate(0.5).resolve(5), 2);
        assert_eq!(Width::Rate(0.01).resolve(10), 1);
        assert_eq!(Width::Rate(4.0).resolve(10), 40);
        assert_eq!(Width::Fixed(0).resolve(10), 1);
        assert_eq!(Width::MemoryBank.resolve(0), 1);
        assert_eq!(Width::MemoryBank.resolve(7), 7);
    }

    #[test]
    fn pause_strategy_never_speaks() {
        let mut agent =
            StrategyAgent::new("pp", snapshot(&[1.0, 0.9]), context(), Strategy::Pause).unwrap();
        let mut rng = GameRng::seed_from_u64(3);
        for _ in 0..20 {
            assert!(agent.propose(&[], &mut rng).is_none());
        }
    }

    #[test]
    fn random_strategy_only_proposes_owned_items() {
        let player = snapshot(&[0.1, 0.2, 0.3]);
        let mut agent =
            StrategyAgent::new("pr", player.clone(), context(), Strategy::Random).unwrap();
        let mut rng = GameRng::seed_from_u64(3);
        for _ in 0..50 {
            let item = agent.propose(&[], &mut rng).unwrap();
            assert!(player.owns(&item));
        }
    }

    #[test]
    fn random_pause_sometimes_passes() {
        let strategy = Strategy::RandomPause {
            speak_probability: DEFAULT_SPEAK_PROBABILITY,
        };
        let mut agent = StrategyAgent::new("prp", snapshot(&[0.5]), context(), strategy).unwrap();
        let mut rng = GameRng::seed_from_u64(11);
        let spoke = (0..400)
            .filter(|_| agent.propose(&[], &mut rng).is_some())
            .count();
        assert!((240..=360).contains(&spoke), "spoke {spoke} of 400");
    }

    #[test]
    fn greedy_speaks_only_above_threshold() {
        // Selfish scorer: utility is the preference bonus of subject 0, 1.0.
        let player = snapshot(&[0.3]);
        let eager = Strategy::Greedy {
            competition_rate: 1.0,
            threshold: Threshold::Static(0.5),
        };
        let shy = Strategy::Greedy {
            competition_rate: 1.0,
            threshold: Threshold::Static(1.0),
        };
        let mut rng = GameRng::seed_from_u64(1);
        let mut speaker = StrategyAgent::new("a", player.clone(), context(), eager).unwrap();
        let mut silent = StrategyAgent::new("b", player.clone(), context(), shy).unwrap();
        assert_eq!(
            speaker.propose(&[], &mut rng),
            player.memory_bank.first().copied()
        );
        assert!(silent.propose(&[], &mut rng).is_none());
    }

    #[test]
    fn out_of_range_parameters_are_rejected() {
        let bad_probability = Strategy::RandomPause {
            speak_probability: 1.5,
        };
        assert!(matches!(
            StrategyAgent::new("x", snapshot(&[0.5]), context(), bad_probability),
            Err(AgentError::InvalidParameter {
                name: "speak_probability",
                ..
            })
        ));

        let zero_depth = Strategy::BeamSearch(BeamSearchParams::new(0, Width::Fixed(4)));
        assert!(matches!(
            zero_depth.validate(),
            Err(AgentError::InvalidParameter { name: "depth", .. })
        ));

        let negative_rate = Strategy::BeamSearch(BeamSearchParams::new(2, Width::Rate(-1.0)));
        assert!(negative_rate.validate().is_err());
    }

    #[test]
    fn retroactive_coherence_reaches_the_scorer() {
        let player = snapshot(&[0.5, 0.4]);
        let params = BeamSearchParams {
            retroactive_coherence: true,
            ..BeamSearchParams::new(2, Width::Fixed(4))
        };
        let agent =
            StrategyAgent::new("b", player.clone(), context(), Strategy::BeamSearch(params)).unwrap();
        assert_eq!(
            agent.scorer(),
            &Scorer::new(player.preferences.clone(), NEUTRAL_COMPETITION_RATE)
                .with_retroactive_coherence(true)
        );
        assert_eq!(agent.strategy(), &Strategy::BeamSearch(params));
        assert_eq!(agent.snapshot(), &player);
        assert_eq!(agent.context(), context());

        let plain = BeamSearchParams::new(2, Width::Fixed(4));
        assert!(!plain.retroactive_coherence);
        assert!(!Strategy::BeamSearch(plain).retroactive_coherence());
        let greedy = Strategy::Greedy {
            competition_rate: 0.5,
            threshold: Threshold::default(),
        };
        let greedy_agent = StrategyAgent::new("g", player.clone(), context(), greedy).unwrap();
        assert_eq!(
            greedy_agent.scorer(),
            &Scorer::new(player.preferences, NEUTRAL_COMPETITION_RATE)
        );
    }
}
