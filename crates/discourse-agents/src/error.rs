//! Error types for the discourse-agents crate.
//!
//! Agent errors only arise while a roster is being assembled, before the
//! first turn. Once a game is running, a misbehaving strategy is never an
//! error: the engine downgrades bad proposals to passes.

/// Errors that can occur while building strategies and rosters.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// No preset is registered under the given code.
    #[error("unknown preset code: {0}")]
    UnknownPreset(String),

    /// A strategy parameter is outside its valid range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: &'static str,
        /// Description of the valid range.
        reason: String,
    },

    /// The roster does not seat exactly one agent per dealt snapshot.
    #[error("roster seats {entries} agents but {snapshots} players were dealt")]
    RosterMismatch {
        /// Number of dealt snapshots.
        snapshots: usize,
        /// Number of seats the roster describes.
        entries: usize,
    },
}
