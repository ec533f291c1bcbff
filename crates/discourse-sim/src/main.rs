//! Simulator binary for the Discourse game.
//!
//! Plays one seeded conversation between the players listed in the roster
//! and prints the final result as JSON on stdout. Logs go to stderr.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `discourse-config.yaml` (or `$DISCOURSE_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Deal the game: validate the pool sizes and generate player snapshots
//! 4. Build the roster from preset codes and seat it
//! 5. Play the conversation, narrating each turn
//! 6. Log the summary
//! 7. Write the result as JSON

mod error;
mod turn_log;

use std::io::Write;
use std::path::PathBuf;

use discourse_agents::build_roster;
use discourse_core::Engine;
use discourse_core::config::SimulationConfig;
use discourse_core::runner;
use discourse_types::RunResult;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::SimError;
use crate::turn_log::TurnLog;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "discourse-config.yaml";

/// Environment variable naming an alternative configuration file.
const CONFIG_PATH_ENV_VAR: &str = "DISCOURSE_CONFIG";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the roster cannot be
/// built, or the result cannot be written.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Logging depends on it, so this comes first.
    let (config, loaded_from) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.logging.level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("discourse-sim starting");
    info!(
        source = %loaded_from.map_or_else(|| String::from("defaults"), |p| p.display().to_string()),
        seed = config.game.seed,
        subjects = config.game.subjects,
        memory_size = config.game.memory_size,
        conversation_length = config.game.conversation_length,
        reject_repeats = config.game.reject_repeats,
        "Configuration loaded"
    );

    let result = play(&config)?;

    // 7. Write the result.
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &result).map_err(SimError::from)?;
    writeln!(stdout)?;

    Ok(())
}

/// Steps 3 to 6: deal, seat, play, summarize.
fn play(config: &SimulationConfig) -> Result<RunResult, SimError> {
    // 3. Deal the game.
    let player_count = config.player_count();
    let mut engine = Engine::new(&config.game, player_count)?;
    info!(players = player_count, "Players dealt");

    // 4. Build and seat the roster.
    let agents = build_roster(&config.roster, engine.snapshots(), engine.context())?;
    engine.seat(agents)?;
    info!(seats = engine.player_names().len(), "Roster seated");

    // 5. Play.
    let mut turn_log = TurnLog::new(&engine);
    let result = runner::run_conversation(&mut engine, &mut turn_log);

    // 6. Summarize.
    runner::log_conversation_end(&result);
    Ok(result)
}

/// Load configuration from `$DISCOURSE_CONFIG` or `discourse-config.yaml`.
///
/// A missing default file is not an error: defaults are used and the
/// returned path is `None`. A missing file named by the environment variable
/// is an error.
fn load_config() -> Result<(SimulationConfig, Option<PathBuf>), SimError> {
    if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV_VAR) {
        let path = PathBuf::from(explicit);
        let config = SimulationConfig::from_file(&path)?;
        return Ok((config, Some(path)));
    }

    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let config = SimulationConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        let mut config = SimulationConfig::default();
        config.game.apply_env_overrides();
        Ok((config, None))
    }
}
