//! Game setup: validation and random generation of player snapshots.
//!
//! Every player is dealt a full preference permutation over the subjects and
//! a private memory bank. The first half of each bank (rounded down) holds
//! two-subject items; the rest carry a single subject. All randomness comes
//! from the engine's generator, so the whole deal is reproducible by seed.

use discourse_types::{GameContext, Item, ItemId, PlayerId, PlayerSnapshot, Subject, Subjects};
use rand::Rng;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::config::GameConfig;
use crate::decision::GameRng;
use crate::engine::EngineError;

/// Importance values are rounded to this many steps per unit (two decimals).
const IMPORTANCE_STEPS: f64 = 100.0;

/// Check that a game with `player_count` seats can be dealt.
///
/// # Errors
///
/// Returns [`EngineError::InvalidSetup`] for an undersized pool.
pub fn validate_setup(config: &GameConfig, player_count: usize) -> Result<(), EngineError> {
    let reason = if player_count == 0 {
        Some("at least one player is required".to_owned())
    } else if config.memory_size == 0 {
        Some("memory_size must be at least 1".to_owned())
    } else if config.conversation_length == 0 {
        Some("conversation_length must be at least 1".to_owned())
    } else if config.subjects == 0 {
        Some("at least one subject is required".to_owned())
    } else if two_subject_items(config.memory_size) > 0 && config.subjects < 2 {
        Some(format!(
            "memory_size {} requires two-subject items but only {} subject is configured",
            config.memory_size, config.subjects
        ))
    } else {
        None
    };

    match reason {
        Some(reason) => Err(EngineError::InvalidSetup { reason }),
        None => Ok(()),
    }
}

/// Number of two-subject items in a bank of `memory_size` items.
pub const fn two_subject_items(memory_size: usize) -> usize {
    memory_size / 2
}

/// The read-only context handed to every agent.
pub const fn game_context(config: &GameConfig, player_count: usize) -> GameContext {
    GameContext {
        number_of_players: player_count,
        conversation_length: config.conversation_length,
    }
}

/// Deal `player_count` snapshots.
///
/// Call [`validate_setup`] first; with an undersized subject pool the
/// generated items fall back to fewer subjects than requested.
pub fn generate_setup(
    config: &GameConfig,
    player_count: usize,
    rng: &mut GameRng,
) -> Vec<PlayerSnapshot> {
    let subjects: Vec<Subject> = (0..config.subjects).collect();
    let paired = two_subject_items(config.memory_size);

    (0..player_count)
        .map(|_| {
            let id = PlayerId::from_random_bytes(rng.random());
            let mut preferences = subjects.clone();
            preferences.shuffle(rng);
            let memory_bank = (0..config.memory_size)
                .map(|slot| generate_item(id, slot < paired, &subjects, rng))
                .collect();
            PlayerSnapshot {
                id,
                preferences,
                memory_bank,
            }
        })
        .collect()
}

fn generate_item(owner: PlayerId, paired: bool, subjects: &[Subject], rng: &mut GameRng) -> Item {
    let id = ItemId::from_random_bytes(rng.random());
    let importance = (rng.random::<f64>() * IMPORTANCE_STEPS).round() / IMPORTANCE_STEPS;
    let amount = if paired { 2 } else { 1 };
    let picked: Vec<Subject> = subjects.choose_multiple(rng, amount).copied().collect();
    let subjects = match picked.as_slice() {
        [first, second] => Subjects::two(*first, *second),
        [only, ..] => Subjects::one(*only),
        [] => Subjects::one(0),
    };
    Item {
        id,
        player_id: owner,
        importance,
        subjects,
    }
}
