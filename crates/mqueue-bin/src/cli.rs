//! Command-line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// mqueue: durable outbound message queue for Discord channels.
#[derive(Parser, Debug)]
#[command(name = "mqueue")]
#[command(about = "Durable outbound message queue for Discord channels")]
pub struct Cli {
    /// Path to the queue database. Defaults to the user data directory.
    #[arg(long, env = "MQUEUE_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MQUEUE_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Also write JSONL logs to this file
    #[arg(long, env = "MQUEUE_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the delivery engine until interrupted.
    Run {
        /// Discord bot token
        #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
        token: String,

        /// Discord REST API base URL
        #[arg(long, env = "DISCORD_API_BASE", default_value = "https://discord.com/api/v10")]
        api_base: String,

        /// Per-request HTTP timeout in seconds
        #[arg(long, env = "MQUEUE_HTTP_TIMEOUT_SECS", default_value = "30")]
        http_timeout_secs: u64,
    },

    /// Queue a plain-text message.
    EnqueueText {
        #[command(flatten)]
        target: Target,

        /// Message text
        text: String,
    },

    /// Queue an embed given as a JSON document.
    EnqueueEmbed {
        #[command(flatten)]
        target: Target,

        /// Embed JSON, e.g. '{"title":"Deploy","description":"done"}'
        json: String,
    },

    /// Delete processed records now.
    Sweep,

    /// Show pending and processed counts.
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Where a queued message goes and who owns it.
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Destination channel id
    #[arg(long)]
    pub channel: String,

    /// Owning producer name
    #[arg(long, default_value = "cli")]
    pub source: String,

    /// Producer-defined identifier passed back on permanent failure
    #[arg(long, default_value = "")]
    pub source_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enqueue_text_with_defaults() {
        let cli = Cli::try_parse_from(["mqueue", "enqueue-text", "--channel", "123", "hello"]).unwrap();
        match cli.command {
            Command::EnqueueText { target, text } => {
                assert_eq!(target.channel, "123");
                assert_eq!(target.source, "cli");
                assert_eq!(target.source_id, "");
                assert_eq!(text, "hello");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mqueue",
            "stats",
            "--json",
            "--db",
            "/tmp/q.db",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.db, Some(PathBuf::from("/tmp/q.db")));
        assert_eq!(cli.log_level, "debug");
        assert!(matches!(cli.command, Command::Stats { json: true }));
    }

    #[test]
    fn enqueue_requires_channel() {
        assert!(Cli::try_parse_from(["mqueue", "enqueue-text", "hello"]).is_err());
    }

    #[test]
    fn run_accepts_token_flag() {
        let cli = Cli::try_parse_from(["mqueue", "run", "--token", "abc", "--http-timeout-secs", "5"]).unwrap();
        match cli.command {
            Command::Run {
                token,
                api_base,
                http_timeout_secs,
            } => {
                assert_eq!(token, "abc");
                assert_eq!(api_base, "https://discord.com/api/v10");
                assert_eq!(http_timeout_secs, 5);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
