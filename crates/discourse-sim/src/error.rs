//! Error types for the simulator binary.
//!
//! [`SimError`] wraps every failure that can stop a run before the first
//! turn, giving `main` a single type to propagate with `?`.

/// Top-level error for the simulator binary.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: discourse_core::config::ConfigError,
    },

    /// The game could not be set up or seated.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: discourse_core::EngineError,
    },

    /// The roster could not be built.
    #[error("roster error: {source}")]
    Agent {
        /// The underlying agent error.
        #[from]
        source: discourse_agents::AgentError,
    },

    /// The final result could not be written.
    #[error("output error: {source}")]
    Output {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}
