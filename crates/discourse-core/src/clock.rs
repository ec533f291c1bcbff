//! Turn counter and termination tracking for one conversation.
//!
//! The clock is the single source of truth for how far the conversation has
//! progressed. It counts turns, tracks the current run of consecutive pauses,
//! and latches the [`EndReason`] once a termination condition is met.
//!
//! # Termination
//!
//! - The history reached `conversation_length` turns.
//! - [`MAX_PAUSE_STREAK`] pauses in a row.

use discourse_types::EndReason;

/// Consecutive pauses after which the conversation ends.
pub const MAX_PAUSE_STREAK: usize = 3;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The conversation has already ended.
    #[error("conversation already ended at turn {turn} ({reason:?})")]
    AlreadyOver {
        /// The turn at which it ended.
        turn: usize,
        /// Why it ended.
        reason: EndReason,
    },

    /// A conversation must allow at least one turn.
    #[error("conversation length must be at least 1")]
    ZeroLength,
}

/// Turn and pause-streak tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationClock {
    /// Number of turns played so far.
    turn: usize,
    /// Current run of consecutive pauses.
    pause_streak: usize,
    /// Maximum number of turns.
    conversation_length: usize,
    /// Set once a termination condition is met.
    end_reason: Option<EndReason>,
}

impl ConversationClock {
    /// Create a clock for a conversation of at most `conversation_length` turns.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::ZeroLength`] if `conversation_length` is 0.
    pub const fn new(conversation_length: usize) -> Result<Self, ClockError> {
        if conversation_length == 0 {
            return Err(ClockError::ZeroLength);
        }
        Ok(Self {
            turn: 0,
            pause_streak: 0,
            conversation_length,
            end_reason: None,
        })
    }

    /// Record one turn. `spoke` is `false` for a pause. Returns the new turn number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::AlreadyOver`] if the conversation has ended.
    pub fn advance(&mut self, spoke: bool) -> Result<usize, ClockError> {
        if let Some(reason) = self.end_reason {
            return Err(ClockError::AlreadyOver {
                turn: self.turn,
                reason,
            });
        }

        self.turn = self.turn.saturating_add(1);
        self.pause_streak = if spoke {
            0
        } else {
            self.pause_streak.saturating_add(1)
        };

        if self.turn >= self.conversation_length {
            self.end_reason = Some(EndReason::LengthReached);
        } else if self.pause_streak >= MAX_PAUSE_STREAK {
            self.end_reason = Some(EndReason::PauseStreak);
        }

        Ok(self.turn)
    }

    /// Number of turns played so far.
    pub const fn turn(&self) -> usize {
        self.turn
    }

    /// Current run of consecutive pauses.
    pub const fn pause_streak(&self) -> usize {
        self.pause_streak
    }

    /// Configured maximum number of turns.
    pub const fn conversation_length(&self) -> usize {
        self.conversation_length
    }

    /// Turns left before the length limit.
    pub const fn remaining(&self) -> usize {
        self.conversation_length.saturating_sub(self.turn)
    }

    /// Whether the conversation has ended.
    pub const fn is_over(&self) -> bool {
        self.end_reason.is_some()
    }

    /// Why the conversation ended, if it has.
    pub const fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }
}
