//! core::config
//!
//! Pipeline configuration.
//!
//! # Overview
//!
//! Every run is driven by one explicit [`PipelineConfig`]; nothing below the
//! CLI reads the process environment. The config is assembled once from:
//!
//! 1. Default values
//! 2. The config file (`$SCHEMASHIP_CONFIG`, else `schemaship.toml` at the
//!    repository root)
//! 3. CLI flags ([`ConfigOverrides`])
//!
//! Later sources override earlier ones. The auth token is the one
//! environment-derived value: `--token`, else `SCHEMASHIP_TOKEN`, else
//! `GITHUB_TOKEN`.
//!
//! # Example
//!
//! ```no_run
//! use schemaship::core::config::{ConfigOverrides, PipelineConfig};
//! use std::path::Path;
//!
//! let config = PipelineConfig::load(Path::new("."), None, ConfigOverrides::default()).unwrap();
//! println!("publishing to {}", config.branch);
//! ```

pub mod schema;

pub use schema::{FileConfig, LoaderConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{BranchName, RepoSlug, TypeError};

/// Config file name looked up at the repository root.
pub const CONFIG_FILE_NAME: &str = "schemaship.toml";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "SCHEMASHIP_CONFIG";

/// Environment variables consulted for the auth token, in order.
pub const TOKEN_ENV: [&str; 2] = ["SCHEMASHIP_TOKEN", "GITHUB_TOKEN"];

pub const DEFAULT_MANIFEST: &str = "manifest.json";
pub const DEFAULT_SCHEMA: &str = "dist/schema.js";
pub const DEFAULT_ENTRY: &str = "dist/index.js";
pub const DEFAULT_OUTPUT_DIR: &str = "dist";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_MESSAGE: &str = "chore: update plugin manifest and build output";
pub const DEFAULT_EXPORT: &str = "pluginSettingsSchema";
pub const DEFAULT_NODE: &str = "node";

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    InvalidType(#[from] TypeError),

    #[error("no auth token: pass --token or set SCHEMASHIP_TOKEN / GITHUB_TOKEN")]
    MissingToken,
}

/// Values supplied on the command line. `None` leaves the lower layer in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub manifest: Option<PathBuf>,
    pub schema: Option<PathBuf>,
    pub entry: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub branch: Option<String>,
    pub message: Option<String>,
    pub repository: Option<String>,
    pub api_base: Option<String>,
    pub token: Option<String>,
    pub node: Option<String>,
    pub export: Option<String>,
    pub dry_run: bool,
}

/// Everything a pipeline run needs, fully resolved.
///
/// Paths are absolute (joined onto `repo_root` when configured relative).
#[derive(Clone)]
pub struct PipelineConfig {
    /// Root of the local repository working tree
    pub repo_root: PathBuf,
    /// Manifest file updated with the normalized schema
    pub manifest_path: PathBuf,
    /// Compiled module exporting the schema
    pub schema_path: PathBuf,
    /// Built plugin entry point
    pub plugin_entry_path: PathBuf,
    /// Build output directory to publish
    pub output_dir: PathBuf,
    /// Commit message for the published revision
    pub commit_message: String,
    /// Branch that receives the commit
    pub branch: BranchName,
    /// Bearer token for the hosting API
    pub auth_token: Option<String>,
    /// Hosting repository; `None` means "derive from the origin remote"
    pub repository: Option<RepoSlug>,
    /// Hosting API base URL override
    pub api_base: Option<String>,
    /// Export holding the schema
    pub export_name: String,
    /// JavaScript runtime used by the loader
    pub node_binary: String,
    /// Stop before publishing
    pub dry_run: bool,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("repo_root", &self.repo_root)
            .field("manifest_path", &self.manifest_path)
            .field("schema_path", &self.schema_path)
            .field("plugin_entry_path", &self.plugin_entry_path)
            .field("output_dir", &self.output_dir)
            .field("commit_message", &self.commit_message)
            .field("branch", &self.branch)
            .field("has_auth_token", &self.auth_token.is_some())
            .field("repository", &self.repository)
            .field("api_base", &self.api_base)
            .field("export_name", &self.export_name)
            .field("node_binary", &self.node_binary)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl PipelineConfig {
    /// Load configuration for the repository at `repo_root`.
    ///
    /// `config_path` overrides the config file lookup. A missing default
    /// config file is not an error; a missing explicit one is.
    pub fn load(
        repo_root: &Path,
        config_path: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let explicit = config_path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let file = match explicit {
            Some(path) => Self::read_file(&path)?,
            None => {
                let path = repo_root.join(CONFIG_FILE_NAME);
                if path.exists() {
                    Self::read_file(&path)?
                } else {
                    FileConfig::default()
                }
            }
        };

        let env_token = TOKEN_ENV
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.is_empty()));

        Self::resolve(repo_root, file, overrides, env_token)
    }

    /// Read and parse a config file.
    pub fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Fold defaults, file values and overrides into a validated config.
    pub fn resolve(
        repo_root: &Path,
        file: FileConfig,
        overrides: ConfigOverrides,
        env_token: Option<String>,
    ) -> Result<Self, ConfigError> {
        let loader = file.loader.unwrap_or_default();
        let path = |flag: Option<PathBuf>, from_file: Option<PathBuf>, default: &str| {
            let chosen = flag.or(from_file).unwrap_or_else(|| PathBuf::from(default));
            if chosen.is_absolute() {
                chosen
            } else {
                repo_root.join(chosen)
            }
        };

        let commit_message = overrides
            .message
            .or(file.message)
            .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());
        if commit_message.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "commit message cannot be empty".into(),
            ));
        }

        let branch = BranchName::new(
            overrides
                .branch
                .or(file.branch)
                .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
        )?;

        let repository = overrides
            .repository
            .or(file.repository)
            .map(|s| s.parse::<RepoSlug>())
            .transpose()?;

        let export_name = overrides
            .export
            .or(loader.export)
            .unwrap_or_else(|| DEFAULT_EXPORT.to_string());
        if export_name.is_empty() {
            return Err(ConfigError::InvalidValue("export name cannot be empty".into()));
        }

        Ok(Self {
            repo_root: repo_root.to_path_buf(),
            manifest_path: path(overrides.manifest, file.manifest, DEFAULT_MANIFEST),
            schema_path: path(overrides.schema, file.schema, DEFAULT_SCHEMA),
            plugin_entry_path: path(overrides.entry, file.entry, DEFAULT_ENTRY),
            output_dir: path(overrides.output_dir, file.output_dir, DEFAULT_OUTPUT_DIR),
            commit_message,
            branch,
            auth_token: overrides.token.or(env_token),
            repository,
            api_base: overrides.api_base.or(file.api_base),
            export_name,
            node_binary: overrides
                .node
                .or(loader.node)
                .unwrap_or_else(|| DEFAULT_NODE.to_string()),
            dry_run: overrides.dry_run,
        })
    }

    /// The auth token, required for any hosting API call.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.auth_token.as_deref().ok_or(ConfigError::MissingToken)
    }
}
