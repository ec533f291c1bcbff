//! The authoritative turn state machine.
//!
//! Each call to [`Engine::step`] runs one turn:
//!
//! 1. **Collect** -- ask every seated [`Proposer`] for at most one item.
//!    Proposals the player does not own (or repeats, when configured) are
//!    downgraded to passes.
//! 2. **Select** -- no proposals is a pause. Otherwise, if the previous
//!    speaker proposed again they keep the floor on a fair coin flip; failing
//!    that, a proposer is drawn uniformly among those with the fewest items
//!    spoken so far.
//! 3. **Score** -- the chosen item is scored against the history as it stands
//!    (coherence sees the past only) and appended.
//! 4. **Terminate** -- after `conversation_length` turns or three pauses in a
//!    row.
//!
//! The engine owns the only random number generator of a game, seeded once
//! at construction. Setup, speaker selection, and every randomised proposer
//! draw from it in a fixed order, so a game is fully determined by its seed
//! and its roster.

use std::collections::BTreeMap;

use discourse_types::{
    EndReason, FinalScores, GameContext, Item, PlayerId, PlayerScore, PlayerSnapshot, Proposal,
    RunResult, Turn, TurnImpact, TurnResult,
};
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::clock::{ClockError, ConversationClock};
use crate::config::GameConfig;
use crate::decision::{GameRng, Proposer};
use crate::runner::{self, NoOpCallback};
use crate::scoring::{self, CoherenceWindow};
use crate::setup;

/// Probability that a previous speaker who proposes again keeps the floor.
pub const RETAIN_FLOOR_PROBABILITY: f64 = 0.5;

/// Errors raised while setting up a game. The turn loop itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The configuration cannot produce a playable game.
    #[error("invalid setup: {reason}")]
    InvalidSetup {
        /// Explanation of what is wrong.
        reason: String,
    },

    /// The number of seated agents does not match the number of players.
    #[error("expected {expected} agents, got {actual}")]
    SeatMismatch {
        /// Number of dealt snapshots.
        expected: usize,
        /// Number of agents supplied.
        actual: usize,
    },

    /// The conversation clock rejected the configuration.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// Game state and turn loop for one conversation.
pub struct Engine {
    /// Game parameters.
    config: GameConfig,
    /// Read-only context shared with agents.
    context: GameContext,
    /// Dealt player state, in seating order.
    snapshots: Vec<PlayerSnapshot>,
    /// Seated agents, aligned with `snapshots`.
    agents: Vec<Box<dyn Proposer>>,
    /// `Some(item)` per spoken turn, `None` per pause.
    history: Vec<Turn>,
    /// Score effect of each history entry at the time it was spoken.
    turn_impact: Vec<Option<TurnImpact>>,
    /// Items each player actually got to say.
    contributions: BTreeMap<PlayerId, Vec<Item>>,
    /// Accumulated individual bonus per player.
    individual: BTreeMap<PlayerId, f64>,
    /// Speaker of the previous turn; cleared by a pause.
    last_speaker: Option<PlayerId>,
    /// Turn and pause-streak tracking.
    clock: ConversationClock,
    /// The game's only source of randomness.
    rng: GameRng,
}

impl Engine {
    /// Validate `config`, seed the generator, and deal `player_count` snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSetup`] for an undersized pool.
    pub fn new(config: &GameConfig, player_count: usize) -> Result<Self, EngineError> {
        setup::validate_setup(config, player_count)?;
        let mut rng = GameRng::seed_from_u64(config.seed);
        let snapshots = setup::generate_setup(config, player_count, &mut rng);
        Self::assemble(config, snapshots, rng)
    }

    /// Build an engine around snapshots dealt elsewhere.
    ///
    /// The generator is still seeded from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSetup`] if there are no snapshots or the
    /// conversation length is zero.
    pub fn from_snapshots(
        config: &GameConfig,
        snapshots: Vec<PlayerSnapshot>,
    ) -> Result<Self, EngineError> {
        if snapshots.is_empty() {
            return Err(EngineError::InvalidSetup {
                reason: "at least one player is required".to_owned(),
            });
        }
        Self::assemble(config, snapshots, GameRng::seed_from_u64(config.seed))
    }

    fn assemble(
        config: &GameConfig,
        snapshots: Vec<PlayerSnapshot>,
        rng: GameRng,
    ) -> Result<Self, EngineError> {
        let clock = ConversationClock::new(config.conversation_length)?;
        let context = setup::game_context(config, snapshots.len());
        let contributions = snapshots.iter().map(|s| (s.id, Vec::new())).collect();
        let individual = snapshots.iter().map(|s| (s.id, 0.0)).collect();

        info!(
            players = snapshots.len(),
            subjects = config.subjects,
            memory_size = config.memory_size,
            conversation_length = config.conversation_length,
            seed = config.seed,
            "Game set up"
        );

        Ok(Self {
            config: config.clone(),
            context,
            snapshots,
            agents: Vec::new(),
            history: Vec::with_capacity(config.conversation_length),
            turn_impact: Vec::with_capacity(config.conversation_length),
            contributions,
            individual,
            last_speaker: None,
            clock,
            rng,
        })
    }

    /// Seat one agent per snapshot, in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SeatMismatch`] if the counts differ.
    pub fn seat(&mut self, agents: Vec<Box<dyn Proposer>>) -> Result<(), EngineError> {
        if agents.len() != self.snapshots.len() {
            return Err(EngineError::SeatMismatch {
                expected: self.snapshots.len(),
                actual: agents.len(),
            });
        }
        self.agents = agents;
        Ok(())
    }

    /// Seat `agents` and play the conversation to the end.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SeatMismatch`] if the agent count is wrong.
    pub fn run(
        &mut self,
        agents: Vec<Box<dyn Proposer>>,
    ) -> Result<RunResult, EngineError> {
        self.seat(agents)?;
        Ok(runner::run_conversation(self, &mut NoOpCallback))
    }

    /// Play one turn. Returns `None` once the conversation is over.
    ///
    /// Seats without an agent always pass.
    pub fn step(&mut self) -> Option<TurnResult> {
        if self.clock.is_over() {
            return None;
        }
        let turn_number = self.clock.turn().saturating_add(1);

        let (proposals, rejected) = self.collect_proposals(turn_number);
        let chosen = self.select_speaker(&proposals);

        let impact = chosen.map(|proposal| self.speak(proposal));
        if impact.is_none() {
            self.history.push(None);
            self.turn_impact.push(None);
            self.last_speaker = None;
        }

        let turn = match self.clock.advance(impact.is_some()) {
            Ok(turn) => turn,
            Err(err) => {
                warn!(%err, "Step on a finished conversation");
                return None;
            }
        };

        debug!(
            turn,
            proposals = proposals.len(),
            rejected = rejected.len(),
            speaker = ?chosen.map(|p| p.player_id),
            pause_streak = self.clock.pause_streak(),
            "Turn played"
        );

        let end_reason = self.clock.end_reason();
        if let Some(reason) = end_reason {
            info!(
                turn,
                ?reason,
                pauses = self.history.iter().filter(|t| t.is_none()).count(),
                "Conversation ended"
            );
        }

        Some(TurnResult {
            turn,
            proposals,
            rejected,
            speaker_id: chosen.map(|p| p.player_id),
            item: chosen.map(|p| p.item),
            impact,
            pause_streak: self.clock.pause_streak(),
            end_reason,
        })
    }

    /// Ask every seat for a proposal and filter out contract violations.
    fn collect_proposals(&mut self, turn: usize) -> (Vec<Proposal>, Vec<PlayerId>) {
        let mut proposals = Vec::new();
        let mut rejected = Vec::new();

        for (seat, snapshot) in self.snapshots.iter().enumerate() {
            let proposed = match self.agents.get_mut(seat) {
                Some(agent) => agent.propose(&self.history, &mut self.rng),
                None => None,
            };
            let Some(item) = proposed else {
                continue;
            };

            if !snapshot.owns(&item) {
                warn!(turn, player = %snapshot.id, item = %item.id, "Proposal not in memory bank, treated as pass");
                rejected.push(snapshot.id);
                continue;
            }
            if self.config.reject_repeats && scoring::is_repeated(&item, &self.history) {
                warn!(turn, player = %snapshot.id, item = %item.id, "Repeated proposal, treated as pass");
                rejected.push(snapshot.id);
                continue;
            }

            proposals.push(Proposal {
                player_id: snapshot.id,
                item,
            });
        }

        (proposals, rejected)
    }

    /// Apply the floor-retention and fairness rules.
    fn select_speaker(&mut self, proposals: &[Proposal]) -> Option<Proposal> {
        if proposals.is_empty() {
            return None;
        }

        if let Some(last) = self.last_speaker {
            if let Some(again) = proposals.iter().find(|p| p.player_id == last) {
                if self.rng.random_bool(RETAIN_FLOOR_PROBABILITY) {
                    return Some(*again);
                }
            }
        }

        let fewest = proposals
            .iter()
            .map(|p| self.contribution_count(p.player_id))
            .min()?;
        let tied: Vec<&Proposal> = proposals
            .iter()
            .filter(|p| self.contribution_count(p.player_id) == fewest)
            .collect();
        let pick = self.rng.random_range(0..tied.len());
        tied.get(pick).copied().copied()
    }

    /// Score and append the chosen item, crediting the speaker.
    fn speak(&mut self, proposal: Proposal) -> TurnImpact {
        let Proposal { player_id, item } = proposal;
        let position = self.history.len();
        let breakdown =
            scoring::shared_breakdown(&item, position, &self.history, CoherenceWindow::PastOnly);
        let individual = self
            .snapshots
            .iter()
            .find(|s| s.id == player_id)
            .map_or(0.0, |s| scoring::individual_bonus(&item, &s.preferences));

        let impact = TurnImpact {
            speaker_id: player_id,
            item,
            breakdown,
            individual,
        };

        self.history.push(Some(item));
        self.turn_impact.push(Some(impact));
        self.contributions.entry(player_id).or_default().push(item);
        *self.individual.entry(player_id).or_insert(0.0) += individual;
        self.last_speaker = Some(player_id);
        impact
    }

    fn contribution_count(&self, player_id: PlayerId) -> usize {
        self.contributions.get(&player_id).map_or(0, Vec::len)
    }

    /// Canonical scores over the history as it stands.
    ///
    /// Shared components are recomputed entry by entry with the two-sided
    /// coherence window; only an item's first occurrence earns importance,
    /// coherence, and freshness. Each player's total is the shared total plus
    /// their own individual bonus, divided by the configured length.
    pub fn final_scores(&self) -> FinalScores {
        let shared_score_breakdown = scoring::score_history(&self.history, CoherenceWindow::TwoSided);
        let shared = shared_score_breakdown.total();
        let length = self.context.conversation_length.max(1) as f64;
        let names = self.player_names();

        let player_scores = self
            .snapshots
            .iter()
            .zip(names)
            .map(|(snapshot, name)| {
                let individual = self.individual.get(&snapshot.id).copied().unwrap_or(0.0);
                PlayerScore {
                    player_id: snapshot.id,
                    name,
                    total: (shared + individual) / length,
                    shared,
                    individual,
                    contributions: self.contribution_count(snapshot.id),
                }
            })
            .collect();

        FinalScores {
            conversation_length: self.context.conversation_length,
            pauses: self.history.iter().filter(|t| t.is_none()).count(),
            player_scores,
            shared_score_breakdown,
        }
    }

    /// Display names in seating order (`player_<seat>` for empty seats).
    pub fn player_names(&self) -> Vec<String> {
        (0..self.snapshots.len())
            .map(|seat| {
                self.agents
                    .get(seat)
                    .map_or_else(|| format!("player_{seat}"), |agent| agent.name().to_owned())
            })
            .collect()
    }

    /// The conversation so far.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// Per-entry impact at speaking time, aligned with [`Engine::history`].
    pub fn turn_impact(&self) -> &[Option<TurnImpact>] {
        &self.turn_impact
    }

    /// Dealt snapshots in seating order.
    pub fn snapshots(&self) -> &[PlayerSnapshot] {
        &self.snapshots
    }

    /// The context shared with agents.
    pub const fn context(&self) -> GameContext {
        self.context
    }

    /// Game parameters.
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Items spoken by each player.
    pub const fn player_contributions(&self) -> &BTreeMap<PlayerId, Vec<Item>> {
        &self.contributions
    }

    /// Number of turns played.
    pub const fn turn(&self) -> usize {
        self.clock.turn()
    }

    /// Current run of consecutive pauses.
    pub const fn pause_streak(&self) -> usize {
        self.clock.pause_streak()
    }

    /// Whether the conversation has ended.
    pub const fn is_over(&self) -> bool {
        self.clock.is_over()
    }

    /// Why the conversation ended, if it has.
    pub const fn end_reason(&self) -> Option<EndReason> {
        self.clock.end_reason()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use discourse_types::{ItemId, Subjects};

    use super::*;
    use crate::decision::PassProposer;

    /// Proposes the planned item for each turn, then passes.
    struct Scripted {
        plan: Vec<Option<Item>>,
        cursor: usize,
    }

    impl Scripted {
        fn boxed(plan: Vec<Option<Item>>) -> Box<dyn Proposer> {
            Box::new(Self { plan, cursor: 0 })
        }
    }

    impl Proposer for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn propose(&mut self, _history: &[Turn], _rng: &mut GameRng) -> Option<Item> {
            let next = self.plan.get(self.cursor).copied().flatten();
            self.cursor = self.cursor.saturating_add(1);
            next
        }
    }

    /// Always proposes its first item.
    struct Eager(Item);

    impl Proposer for Eager {
        fn name(&self) -> &str {
            "eager"
        }

        fn propose(&mut self, _history: &[Turn], _rng: &mut GameRng) -> Option<Item> {
            Some(self.0)
        }
    }

    fn snapshot(tag: u8, subjects: &[Subjects]) -> PlayerSnapshot {
        let id = PlayerId::from_random_bytes([tag; 16]);
        let memory_bank = subjects
            .iter()
            .enumerate()
            .map(|(slot, s)| Item {
                id: ItemId::from_random_bytes([tag.wrapping_mul(16).wrapping_add(u8::try_from(slot).unwrap()); 16]),
                player_id: id,
                importance: 0.5,
                subjects: *s,
            })
            .collect();
        PlayerSnapshot {
            id,
            preferences: (0..10).collect(),
            memory_bank,
        }
    }

    fn config(length: usize, seed: u64) -> GameConfig {
        GameConfig {
            conversation_length: length,
            seed,
            ..GameConfig::default()
        }
    }

    fn first_item(snapshot: &PlayerSnapshot) -> Item {
        *snapshot.memory_bank.first().unwrap()
    }

    #[test]
    fn all_pass_ends_after_three_turns() {
        let mut engine = Engine::new(&config(10, 1), 3).unwrap();
        let agents: Vec<Box<dyn Proposer>> = (0..3)
            .map(|_| Box::new(PassProposer::new()) as Box<dyn Proposer>)
            .collect();
        let result = engine.run(agents).unwrap();
        assert_eq!(result.history, vec![None, None, None]);
        assert_eq!(engine.end_reason(), Some(EndReason::PauseStreak));
        assert!(engine.step().is_none());
    }

    #[test]
    fn seat_count_must_match() {
        let mut engine = Engine::new(&config(10, 1), 2).unwrap();
        let result = engine.seat(vec![Box::new(PassProposer::new())]);
        assert!(matches!(
            result,
            Err(EngineError::SeatMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn invalid_setup_is_rejected_eagerly() {
        assert!(matches!(
            Engine::new(&config(10, 1), 0),
            Err(EngineError::InvalidSetup { .. })
        ));
        assert!(Engine::from_snapshots(&config(10, 1), Vec::new()).is_err());
    }

    #[test]
    fn unowned_proposal_is_a_pass() {
        let a = snapshot(1, &[Subjects::one(1)]);
        let b = snapshot(2, &[Subjects::one(2)]);
        let stolen = first_item(&b);
        let mut engine = Engine::from_snapshots(&config(5, 1), vec![a.clone(), b]).unwrap();
        engine
            .seat(vec![Scripted::boxed(vec![Some(stolen)]), Box::new(PassProposer::new())])
            .unwrap();
        let result = engine.step().unwrap();
        assert_eq!(result.rejected, vec![a.id]);
        assert!(result.proposals.is_empty());
        assert!(result.item.is_none());
        assert_eq!(engine.pause_streak(), 1);
    }

    #[test]
    fn repeats_rejected_only_when_configured() {
        let a = snapshot(1, &[Subjects::one(1)]);
        let item = first_item(&a);

        let mut lenient = Engine::from_snapshots(&config(5, 1), vec![a.clone()]).unwrap();
        lenient.seat(vec![Box::new(Eager(item))]).unwrap();
        lenient.step().unwrap();
        let second = lenient.step().unwrap();
        assert_eq!(second.item, Some(item));
        let impact = second.impact.unwrap();
        assert!(impact.breakdown.importance.abs() < 1e-12);
        assert!((impact.breakdown.nonmonotonousness + 1.0).abs() < 1e-12);

        let strict_config = GameConfig {
            reject_repeats: true,
            ..config(5, 1)
        };
        let mut strict = Engine::from_snapshots(&strict_config, vec![a.clone()]).unwrap();
        assert!(strict.config().reject_repeats);
        assert!(!lenient.config().reject_repeats);
        strict.seat(vec![Box::new(Eager(item))]).unwrap();
        strict.step().unwrap();
        let second = strict.step().unwrap();
        assert!(second.item.is_none());
        assert_eq!(second.rejected, vec![a.id]);
    }

    #[test]
    fn fewest_contributions_wins_without_retention() {
        let a = snapshot(1, &[Subjects::one(1)]);
        let b = snapshot(2, &[Subjects::one(2)]);
        let c = snapshot(3, &[Subjects::one(3)]);
        let (ia, ib, ic) = (first_item(&a), first_item(&b), first_item(&c));

        for seed in 0..20 {
            let mut engine =
                Engine::from_snapshots(&config(5, seed), vec![a.clone(), b.clone(), c.clone()])
                    .unwrap();
            engine
                .seat(vec![
                    Scripted::boxed(vec![Some(ia), None, Some(ia)]),
                    Scripted::boxed(vec![None, None, Some(ib)]),
                    Scripted::boxed(vec![None, Some(ic), None]),
                ])
                .unwrap();
            assert_eq!(engine.step().unwrap().speaker_id, Some(a.id));
            assert_eq!(engine.step().unwrap().speaker_id, Some(c.id));
            // c did not propose again, so b (0 items) beats a (1 item).
            assert_eq!(engine.step().unwrap().speaker_id, Some(b.id));
        }
    }

    #[test]
    fn previous_speaker_retains_about_half_the_time() {
        let a = snapshot(1, &[Subjects::one(1)]);
        let b = snapshot(2, &[Subjects::one(2)]);
        let mut retained = 0_usize;
        let trials = 400_u64;
        for seed in 0..trials {
            let mut engine =
                Engine::from_snapshots(&config(5, seed), vec![a.clone(), b.clone()]).unwrap();
            engine
                .seat(vec![Box::new(Eager(first_item(&a))), Box::new(Eager(first_item(&b)))])
                .unwrap();
            let first = engine.step().unwrap().speaker_id;
            let second = engine.step().unwrap().speaker_id;
            if first == second {
                retained = retained.saturating_add(1);
            }
        }
        assert!((140..=260).contains(&retained), "retained {retained} of {trials}");
    }

    #[test]
    fn pause_clears_last_speaker() {
        let a = snapshot(1, &[Subjects::one(1)]);
        let b = snapshot(2, &[Subjects::one(2)]);
        let (ia, ib) = (first_item(&a), first_item(&b));
        for seed in 0..20 {
            let mut engine =
                Engine::from_snapshots(&config(6, seed), vec![a.clone(), b.clone()]).unwrap();
            engine
                .seat(vec![
                    Scripted::boxed(vec![Some(ia), None, Some(ia)]),
                    Scripted::boxed(vec![None, None, Some(ib)]),
                ])
                .unwrap();
            engine.step().unwrap();
            assert!(engine.step().unwrap().item.is_none());
            // No retention after a pause: b has fewer items and always wins.
            assert_eq!(engine.step().unwrap().speaker_id, Some(b.id));
        }
    }

    #[test]
    fn final_scores_normalise_by_length() {
        let a = snapshot(1, &[Subjects::one(0)]);
        let item = first_item(&a);
        let mut engine = Engine::from_snapshots(&config(4, 1), vec![a.clone()]).unwrap();
        engine
            .seat(vec![Scripted::boxed(vec![Some(item)])])
            .unwrap();
        while engine.step().is_some() {}

        // history: item, pause, pause, pause -> ends at length 4.
        assert_eq!(engine.history().len(), 4);
        let scores = engine.final_scores();
        assert_eq!(scores.pauses, 3);
        // importance 0.5, coherence -1 (alone), freshness 0, nonmono 0.
        assert!((scores.shared_score_breakdown.total() + 0.5).abs() < 1e-12);
        let line = scores.player_scores.first().unwrap();
        // preferences 0..10: subject 0 has rank 0 => bonus 1.
        assert!((line.individual - 1.0).abs() < 1e-12);
        assert!((line.total - 0.5 / 4.0).abs() < 1e-12);
        assert_eq!(line.contributions, 1);
        assert_eq!(line.name, "scripted");
    }
}
