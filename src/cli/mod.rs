//! cli
//!
//! Command-line interface layer for schemaship.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Set up logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! handlers that call into [`crate::engine`]. Library errors are typed; here
//! they become `anyhow` errors and `main` prints the whole cause chain.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::Result;

use crate::ui::output::Verbosity;

/// Environment variable that overrides the log filter.
pub const LOG_ENV: &str = "SCHEMASHIP_LOG";

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    init_tracing(verbosity)?;

    let ctx = commands::Context {
        cwd: cli.cwd.clone(),
        config: cli.config.clone(),
        verbosity,
    };

    commands::dispatch(cli.command, &ctx)
}

/// Install the global `tracing` subscriber, writing to stderr.
///
/// `SCHEMASHIP_LOG` takes precedence over the verbosity flags.
fn init_tracing(verbosity: Verbosity) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(verbosity.log_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}
