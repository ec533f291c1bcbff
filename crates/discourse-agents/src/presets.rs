//! Named strategy presets and roster assembly.
//!
//! A roster in the configuration file is a list of `{preset, count}` lines.
//! [`build_roster`] expands it into one [`StrategyAgent`] per dealt player,
//! in seat order. Unknown codes and size mismatches fail here, before the
//! first turn.

use discourse_core::Proposer;
use discourse_core::config::RosterEntry;
use discourse_types::{GameContext, PlayerSnapshot};
use tracing::info;

use crate::error::AgentError;
use crate::strategy::{BeamSearchParams, DEFAULT_SPEAK_PROBABILITY, Strategy, StrategyAgent, Width};
use crate::threshold::Threshold;

/// Every registered preset code.
pub const PRESET_CODES: &[&str] = &[
    "pp",
    "pr",
    "prp",
    "p_balanced_greedy",
    "p_selfless_greedy",
    "p_selfish_greedy",
    "p_bst_low",
    "p_bst_medium",
    "p_bst_high",
    "p_bst_dynamic",
    "p_bst_dynamic_width",
    "p_bst_dynamic_depth",
    "p_bst_dynamic_high",
];

/// Look up the strategy registered under `code`.
///
/// # Errors
///
/// Returns [`AgentError::UnknownPreset`] for unregistered codes.
pub fn preset(code: &str) -> Result<Strategy, AgentError> {
    let strategy = match code {
        "pp" => Strategy::Pause,
        "pr" => Strategy::Random,
        "prp" => Strategy::RandomPause {
            speak_probability: DEFAULT_SPEAK_PROBABILITY,
        },
        "p_balanced_greedy" => Strategy::Greedy {
            competition_rate: 0.5,
            threshold: Threshold::Static(0.5),
        },
        "p_selfless_greedy" => Strategy::Greedy {
            competition_rate: 0.0,
            threshold: Threshold::default(),
        },
        "p_selfish_greedy" => Strategy::Greedy {
            competition_rate: 1.0,
            threshold: Threshold::default(),
        },
        "p_bst_low" => beam(2, Width::Fixed(4)),
        "p_bst_medium" => beam(3, Width::Fixed(16)),
        "p_bst_high" => beam(6, Width::Fixed(128)),
        "p_bst_dynamic" => beam(3, Width::Rate(0.5)),
        "p_bst_dynamic_width" => beam(3, Width::Rate(4.0)),
        "p_bst_dynamic_depth" => beam(6, Width::Rate(0.5)),
        "p_bst_dynamic_high" => beam(6, Width::Rate(8.0)),
        other => return Err(AgentError::UnknownPreset(other.to_owned())),
    };
    Ok(strategy)
}

fn beam(depth: usize, width: Width) -> Strategy {
    Strategy::BeamSearch(BeamSearchParams::new(depth, width))
}

/// Seat one agent per snapshot following `entries` in order.
///
/// # Errors
///
/// - [`AgentError::UnknownPreset`] if any entry names an unregistered code.
/// - [`AgentError::RosterMismatch`] if the counts do not add up to the
///   number of snapshots.
/// - [`AgentError::InvalidParameter`] if a preset fails validation.
pub fn build_roster(
    entries: &[RosterEntry],
    snapshots: &[PlayerSnapshot],
    context: GameContext,
) -> Result<Vec<Box<dyn Proposer>>, AgentError> {
    let mut seats: Vec<(&str, Strategy)> = Vec::with_capacity(snapshots.len());
    for entry in entries {
        let strategy = preset(&entry.preset)?;
        for _ in 0..entry.count {
            seats.push((entry.preset.as_str(), strategy));
        }
    }

    if seats.len() != snapshots.len() {
        return Err(AgentError::RosterMismatch {
            snapshots: snapshots.len(),
            entries: seats.len(),
        });
    }

    let mut agents: Vec<Box<dyn Proposer>> = Vec::with_capacity(seats.len());
    for ((code, strategy), snapshot) in seats.into_iter().zip(snapshots) {
        info!(
            player_id = %snapshot.id,
            preset = code,
            strategy = strategy.kind(),
            memories = snapshot.memory_bank.len(),
            "Seating player"
        );
        let agent = StrategyAgent::new(code, snapshot.clone(), context, strategy)?;
        agents.push(Box::new(agent));
    }
    Ok(agents)
}
