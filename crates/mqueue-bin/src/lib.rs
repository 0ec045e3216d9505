//! mqueue: command-line runner and admin tool for the delivery queue.
//!
//! `mqueue run` hosts the delivery engine against the Discord REST API until
//! interrupted. The remaining subcommands work directly on the queue
//! database and are safe to use while a runner is active:
//!
//! ```text
//! mqueue enqueue-text --channel 123 "deploy finished"
//! mqueue enqueue-embed --channel 123 '{"title":"Deploy","description":"done"}'
//! mqueue stats --json
//! mqueue sweep
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Command, Target};
pub use config::RunConfig;
pub use error::{CliError, CliResult};
