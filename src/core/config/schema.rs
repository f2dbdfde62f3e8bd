//! core::config::schema
//!
//! On-disk configuration file format.
//!
//! # Location
//!
//! 1. `$SCHEMASHIP_CONFIG` if set
//! 2. `schemaship.toml` at the repository root
//!
//! # Validation
//!
//! Unknown keys are rejected. Values are validated when the file is folded
//! into a [`PipelineConfig`](super::PipelineConfig).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Pipeline settings as written in `schemaship.toml`.
///
/// Paths are relative to the repository root.
///
/// # Example
///
/// ```toml
/// manifest = "manifest.json"
/// schema = "dist/schema.js"
/// entry = "dist/index.js"
/// output_dir = "dist"
/// branch = "main"
/// message = "chore: publish plugin build"
/// repository = "octocat/my-plugin"
///
/// [loader]
/// node = "node"
/// export = "pluginSettingsSchema"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Manifest to update
    pub manifest: Option<PathBuf>,

    /// Compiled module exporting the settings schema
    pub schema: Option<PathBuf>,

    /// Built plugin entry point (must exist before publishing)
    pub entry: Option<PathBuf>,

    /// Directory of build outputs to publish
    pub output_dir: Option<PathBuf>,

    /// Target branch
    pub branch: Option<String>,

    /// Commit message
    pub message: Option<String>,

    /// Hosting repository (`owner/repo`); derived from `origin` if absent
    pub repository: Option<String>,

    /// Hosting API base URL
    pub api_base: Option<String>,

    /// Loader settings
    pub loader: Option<LoaderConfig>,
}

/// Settings for schema extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// JavaScript runtime binary
    pub node: Option<String>,

    /// Name of the export holding the schema
    pub export: Option<String>,
}
