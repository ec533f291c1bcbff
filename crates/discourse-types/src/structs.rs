//! Core entity structs: items, player snapshots, and the game context.
//!
//! Everything here is immutable once the engine has issued it. Items are
//! `Copy` so histories and hypothetical search contexts can be cloned freely.

use serde::{Deserialize, Serialize};

use crate::ids::{ItemId, PlayerId};

/// A subject tag. Subjects are numbered `0..subjects` for a given game.
pub type Subject = u32;

/// One slot of the conversation: `Some(item)` when someone spoke, `None` for a pause.
pub type Turn = Option<Item>;

/// The one or two subject tags carried by an [`Item`].
///
/// A two-subject item always carries two distinct subjects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subjects {
    /// The first (always present) subject.
    pub first: Subject,
    /// The optional second subject, distinct from `first`.
    pub second: Option<Subject>,
}

impl Subjects {
    /// A single-subject tag set.
    pub const fn one(subject: Subject) -> Self {
        Self {
            first: subject,
            second: None,
        }
    }

    /// A two-subject tag set. Returns a single-subject set if both are equal.
    pub const fn two(first: Subject, second: Subject) -> Self {
        if first == second {
            Self::one(first)
        } else {
            Self {
                first,
                second: Some(second),
            }
        }
    }

    /// Number of subjects (1 or 2).
    pub const fn len(&self) -> usize {
        if self.second.is_some() { 2 } else { 1 }
    }

    /// Always `false`; every item carries at least one subject.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Whether `subject` is one of these tags.
    pub fn contains(&self, subject: Subject) -> bool {
        self.first == subject || self.second == Some(subject)
    }

    /// Whether any tag is shared with `other`.
    pub fn intersects(&self, other: &Self) -> bool {
        self.iter().any(|s| other.contains(s))
    }

    /// Iterate over the tags in order.
    pub fn iter(&self) -> impl Iterator<Item = Subject> + '_ {
        core::iter::once(self.first).chain(self.second)
    }
}

/// An atomic proposable fact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Globally unique identifier.
    pub id: ItemId,
    /// The player whose memory bank holds this item.
    pub player_id: PlayerId,
    /// Importance in `[0, 1]`.
    pub importance: f64,
    /// Subject tags.
    pub subjects: Subjects,
}

/// Everything a player is dealt at the start of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// The player's identifier.
    pub id: PlayerId,
    /// A permutation of every subject; position encodes preference rank
    /// (index 0 is the favourite).
    pub preferences: Vec<Subject>,
    /// Items this player may propose.
    pub memory_bank: Vec<Item>,
}

impl PlayerSnapshot {
    /// Whether `item` (matched by id and content) is in this player's memory bank.
    pub fn owns(&self, item: &Item) -> bool {
        self.memory_bank.iter().any(|own| own == item)
    }
}

/// Read-only game parameters handed to every agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameContext {
    /// Number of seated players.
    pub number_of_players: usize,
    /// Maximum number of turns.
    pub conversation_length: usize,
}
