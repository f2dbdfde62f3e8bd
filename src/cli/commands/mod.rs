//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Resolves the repository root and configuration
//! 2. Calls the engine
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! `publish` talks to the hosting API and is async. The handler builds a
//! tokio runtime and blocks on the pipeline, so the rest of the CLI stays
//! synchronous.

mod manifest;
mod normalize;
mod publish;
mod schema;
mod status;

pub use manifest::manifest;
pub use normalize::normalize;
pub use publish::publish;
pub use schema::schema;
pub use status::status;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::cli::args::{Command, PipelineArgs};
use crate::core::config::PipelineConfig;
use crate::git::Git;
use crate::ui::output::Verbosity;

/// Settings shared by every command, taken from the global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub cwd: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub verbosity: Verbosity,
}

impl Context {
    /// Directory the command runs in.
    pub fn cwd(&self) -> Result<PathBuf> {
        match &self.cwd {
            Some(cwd) => Ok(cwd.clone()),
            None => std::env::current_dir().context("failed to determine current directory"),
        }
    }

    /// Open the repository containing the working directory.
    pub fn open_git(&self) -> Result<Git> {
        let cwd = self.cwd()?;
        Git::open(&cwd).with_context(|| format!("'{}' is not inside a git repository", cwd.display()))
    }

    /// Load configuration rooted at `root`.
    pub fn load_config(
        &self,
        root: &Path,
        args: &PipelineArgs,
        dry_run: bool,
    ) -> Result<PipelineConfig> {
        let config = PipelineConfig::load(root, self.config.as_deref(), args.overrides(dry_run))?;
        tracing::debug!(?config, "configuration resolved");
        Ok(config)
    }

    /// Repository root if inside a repository, else the working directory.
    ///
    /// Commands that never touch git use this so they also work in a plain
    /// directory.
    pub fn project_root(&self) -> Result<PathBuf> {
        let cwd = self.cwd()?;
        match Git::open(&cwd) {
            Ok(git) => Ok(git.work_dir()?.to_path_buf()),
            Err(_) => Ok(cwd),
        }
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Publish { dry_run, pipeline } => publish::publish(ctx, &pipeline, dry_run),
        Command::Manifest { pipeline } => manifest::manifest(ctx, &pipeline),
        Command::Schema { raw, pipeline } => schema::schema(ctx, &pipeline, raw),
        Command::Normalize { file, write } => normalize::normalize(ctx, &file, write),
        Command::Status { pipeline } => status::status(ctx, &pipeline),
    }
}
