//! Configuration for the mqueue binary.

use crate::error::{CliError, CliResult};
use mqueue::{DiscordConfig, EngineConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for `mqueue run`.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Path to the SQLite queue database
    pub db_path: PathBuf,

    /// Delivery API client settings
    pub discord: DiscordConfig,

    /// Engine timings, from `MQUEUE_*` environment variables
    pub engine: EngineConfig,
}

impl RunConfig {
    /// Build the run configuration.
    ///
    /// Engine timings come from the environment; the token must be non-empty.
    pub fn new(
        db_path: PathBuf,
        token: String,
        api_base: String,
        http_timeout: Duration,
    ) -> CliResult<Self> {
        let token = token.trim().to_string();
        if token.is_empty() {
            return Err(CliError::Config(
                "Discord bot token is empty. Use --token or DISCORD_TOKEN.".to_string(),
            ));
        }

        Ok(Self {
            db_path,
            discord: DiscordConfig {
                api_base: api_base.trim_end_matches('/').to_string(),
                token,
                timeout: http_timeout,
            },
            engine: EngineConfig::from_env(),
        })
    }
}

/// Default database location: `<data dir>/mqueue/mqueue.db`, falling back to
/// `~/.mqueue/mqueue.db`.
pub fn default_db_path() -> CliResult<PathBuf> {
    if let Some(data) = dirs::data_dir() {
        return Ok(data.join("mqueue").join("mqueue.db"));
    }
    dirs::home_dir()
        .map(|home| home.join(".mqueue").join("mqueue.db"))
        .ok_or_else(|| {
            CliError::Config("No data or home directory found. Use --db.".to_string())
        })
}

/// The explicit path when given, the default otherwise.
pub fn resolve_db_path(explicit: Option<PathBuf>) -> CliResult<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => default_db_path(),
    }
}
