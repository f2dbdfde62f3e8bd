//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--config <path>`: Use this config file instead of `schemaship.toml`
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Errors only

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::ConfigOverrides;

/// schemaship - publish a plugin's settings schema and build output
#[derive(Parser, Debug)]
#[command(name = "schemaship")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if schemaship was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Config file (default: $SCHEMASHIP_CONFIG, then ./schemaship.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Flags shared by every command that runs part of the pipeline.
///
/// Each one overrides the matching config file value.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Manifest file to update
    #[arg(long, value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Compiled module exporting the settings schema
    #[arg(long, value_name = "PATH")]
    pub schema: Option<PathBuf>,

    /// Built plugin entry point that must exist before publishing
    #[arg(long, value_name = "PATH")]
    pub entry: Option<PathBuf>,

    /// Build output directory
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Branch that receives the commit
    #[arg(long)]
    pub branch: Option<String>,

    /// Commit message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Hosted repository as owner/repo (default: parsed from origin)
    #[arg(long, value_name = "OWNER/REPO")]
    pub repo: Option<String>,

    /// API base URL (GitHub Enterprise)
    #[arg(long, value_name = "URL")]
    pub api_base: Option<String>,

    /// API token (default: $SCHEMASHIP_TOKEN, then $GITHUB_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// JavaScript runtime used to load the schema module
    #[arg(long, value_name = "PROGRAM")]
    pub node: Option<String>,

    /// Name of the schema export
    #[arg(long, value_name = "NAME")]
    pub export: Option<String>,
}

impl PipelineArgs {
    /// Convert to config overrides.
    pub fn overrides(&self, dry_run: bool) -> ConfigOverrides {
        ConfigOverrides {
            manifest: self.manifest.clone(),
            schema: self.schema.clone(),
            entry: self.entry.clone(),
            output_dir: self.output_dir.clone(),
            branch: self.branch.clone(),
            message: self.message.clone(),
            repository: self.repo.clone(),
            api_base: self.api_base.clone(),
            token: self.token.clone(),
            node: self.node.clone(),
            export: self.export.clone(),
            dry_run,
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Update the manifest and publish it with the build output
    #[command(
        long_about = "Update the manifest and publish it with the build output.\n\n\
            Extracts the settings schema from the compiled module, normalizes it, writes it \
            into the manifest, and, if the manifest or build output differ from HEAD, commits \
            them to the remote branch as a single revision.",
        after_help = "\
EXAMPLES:
    # Publish to main using $GITHUB_TOKEN
    schemaship publish

    # See what would be published
    schemaship publish --dry-run

    # Publish to another branch of another repository
    schemaship publish --branch release --repo octocat/plugin"
    )]
    Publish {
        /// Stop before anything is sent to the remote
        #[arg(long)]
        dry_run: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Update the manifest only (no network)
    Manifest {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Print the settings schema extracted from the compiled module
    Schema {
        /// Print the export as-is, without normalization
        #[arg(long)]
        raw: bool,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },

    /// Normalize a JSON schema file
    Normalize {
        /// Schema file to read
        file: PathBuf,

        /// Rewrite the file in place instead of printing
        #[arg(short, long)]
        write: bool,
    },

    /// Show which publishable files differ from HEAD
    Status {
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
}
