//! # Observability
//!
//! Logging setup shared by the mqueue crates.
//!
//! Library crates only ever use `tracing` macros. The binary calls
//! [`init_with_config`] once at startup to decide where events go:
//!
//! - a compact human-readable layer on stderr, and/or
//! - an append-only JSONL file (one event per line, flushed per line).
//!
//! `RUST_LOG` always overrides the configured default level.
//!
//! ```rust,ignore
//! fn main() -> std::io::Result<()> {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "mqueue".into(),
//!         default_level: "debug".into(),
//!         ..Default::default()
//!     })?;
//!
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

mod file;

pub use file::JsonlFileWriter;

use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, logged once at startup and attached to the root
    /// span of every JSONL line.
    pub service_name: String,

    /// Default level filter (e.g. "debug", "info", "warn").
    pub default_level: String,

    /// Optional JSONL log file.
    pub log_path: Option<PathBuf>,

    /// Emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
        }
    }
}

impl LogConfig {
    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }
}

/// Initialize logging with default settings for `service_name`.
pub fn init(service_name: &str) -> std::io::Result<()> {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    })
}

/// Initialize logging with a custom configuration.
///
/// Fails only when the JSONL file cannot be opened. Installing a second
/// global subscriber is ignored, so tests may call this repeatedly.
pub fn init_with_config(config: LogConfig) -> std::io::Result<()> {
    let file_layer = match &config.log_path {
        Some(path) => {
            let writer = JsonlFileWriter::open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(writer)
                    .with_filter(config.env_filter()),
            )
        }
        None => None,
    };

    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(config.env_filter())
    });

    let installed = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            service = %config.service_name,
            pid = std::process::id(),
            log_path = ?config.log_path,
            "observability initialized"
        );
    }

    Ok(())
}

pub use tracing::{debug, error, info, instrument, trace, warn, Level};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.service_name, "unknown");
        assert_eq!(config.default_level, "info");
        assert!(config.log_path.is_none());
        assert!(config.also_stderr);
    }

    #[test]
    fn init_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig {
            service_name: "test".into(),
            log_path: Some(dir.path().join("test.jsonl")),
            also_stderr: false,
            ..Default::default()
        };

        assert!(init_with_config(config.clone()).is_ok());
        assert!(init_with_config(config).is_ok());
    }
}
