//! Configuration loading and typed config structures for the Discourse game.
//!
//! The canonical configuration lives in `discourse-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads it. Every field is optional in
//! the file; missing values fall back to the defaults below.

use std::path::Path;

use serde::Deserialize;

/// Environment variable that overrides [`GameConfig::seed`].
pub const SEED_ENV_VAR: &str = "DISCOURSE_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `discourse-config.yaml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Game-level settings (pool sizes, length, seed).
    #[serde(default)]
    pub game: GameConfig,

    /// Who sits at the table, as preset codes with seat counts.
    #[serde(default = "default_roster")]
    pub roster: Vec<RosterEntry>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `DISCOURSE_SEED`, when set to a valid integer, overrides `game.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.game.apply_env_overrides();
        Ok(config)
    }

    /// Total number of seats across the roster.
    pub fn player_count(&self) -> usize {
        self.roster
            .iter()
            .fold(0_usize, |acc, entry| acc.saturating_add(entry.count))
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            roster: default_roster(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Game-level configuration consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Number of distinct subjects (`0..subjects`).
    #[serde(default = "default_subjects")]
    pub subjects: u32,

    /// Items dealt to each player.
    #[serde(default = "default_memory_size")]
    pub memory_size: usize,

    /// Maximum number of turns.
    #[serde(default = "default_conversation_length")]
    pub conversation_length: usize,

    /// Seed for the engine's random number generator.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Treat a proposal of an item already in history as a pass.
    #[serde(default)]
    pub reject_repeats: bool,
}

impl GameConfig {
    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        let value = std::env::var(SEED_ENV_VAR).ok();
        self.apply_seed_override(value.as_deref());
    }

    /// Replace the seed with `value` if it parses as an integer.
    pub fn apply_seed_override(&mut self, value: Option<&str>) {
        if let Some(seed) = value.and_then(|raw| raw.trim().parse::<u64>().ok()) {
            self.seed = seed;
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            subjects: default_subjects(),
            memory_size: default_memory_size(),
            conversation_length: default_conversation_length(),
            seed: default_seed(),
            reject_repeats: false,
        }
    }
}

/// One roster line: a strategy preset and how many seats it fills.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RosterEntry {
    /// Preset code, e.g. `p_bst_low`.
    pub preset: String,

    /// Number of seats.
    #[serde(default = "default_count")]
    pub count: usize,
}

impl RosterEntry {
    /// Create a roster entry.
    pub fn new(preset: impl Into<String>, count: usize) -> Self {
        Self {
            preset: preset.into(),
            count,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_subjects() -> u32 {
    20
}

const fn default_memory_size() -> usize {
    10
}

const fn default_conversation_length() -> usize {
    10
}

const fn default_seed() -> u64 {
    91
}

const fn default_count() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_roster() -> Vec<RosterEntry> {
    vec![
        RosterEntry::new("p_bst_low", 2),
        RosterEntry::new("p_balanced_greedy", 2),
        RosterEntry::new("pr", 1),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.game.subjects, 20);
        assert_eq!(config.game.memory_size, 10);
        assert_eq!(config.game.conversation_length, 10);
        assert_eq!(config.game.seed, 91);
        assert!(!config.game.reject_repeats);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.player_count(), 5);
    }

    #[test]
    fn parse_partial_yaml_fills_defaults() {
        let yaml = r"
game:
  memory_size: 6
  reject_repeats: true
roster:
  - preset: p_bst_medium
    count: 3
  - preset: pp
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.game.memory_size, 6);
        assert!(config.game.reject_repeats);
        assert_eq!(config.game.subjects, 20);
        assert_eq!(config.roster.len(), 2);
        assert_eq!(config.roster.first().map(|e| e.count), Some(3));
        assert_eq!(config.roster.get(1).map(|e| e.count), Some(1));
        assert_eq!(config.player_count(), 4);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = SimulationConfig::parse("{}").unwrap();
        assert_eq!(config.roster, default_roster());
    }

    #[test]
    fn shipped_file_matches_defaults() {
        let shipped = SimulationConfig::parse(include_str!("../../../discourse-config.yaml")).unwrap();
        let defaults = SimulationConfig::default();
        assert_eq!(shipped.roster, defaults.roster);
        assert_eq!(shipped.logging, defaults.logging);
        assert_eq!(shipped.game.subjects, defaults.game.subjects);
        assert_eq!(shipped.game.memory_size, defaults.game.memory_size);
        assert_eq!(
            shipped.game.conversation_length,
            defaults.game.conversation_length
        );
    }

    #[test]
    fn invalid_yaml_is_error() {
        let result = SimulationConfig::parse("game: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn seed_override_applies_only_when_parseable() {
        let mut game = GameConfig::default();
        game.apply_seed_override(Some("not-a-number"));
        assert_eq!(game.seed, 91);
        game.apply_seed_override(Some(" 1234 "));
        assert_eq!(game.seed, 1234);
        game.apply_seed_override(None);
        assert_eq!(game.seed, 1234);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = SimulationConfig::from_file(Path::new("/nonexistent/discourse-config.yaml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
