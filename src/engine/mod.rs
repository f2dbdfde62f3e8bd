//! engine
//!
//! Orchestrates a pipeline run: Load -> Normalize -> Merge -> Detect -> Publish.
//!
//! # Architecture
//!
//! Each step consumes the previous step's output and the run is strictly
//! sequential. Only the last step talks to the network.
//!
//! 1. **Load**: extract the schema export from the compiled module
//! 2. **Normalize**: prune `required` entries made redundant by defaults
//! 3. **Merge**: write the schema into the manifest's `configuration` key
//! 4. **Detect**: stage manifest and build output, diff against `HEAD`
//! 5. **Publish**: commit the files to the remote branch in one revision
//!
//! If step 4 finds nothing, step 5 never runs.
//!
//! # Example
//!
//! ```ignore
//! use schemaship::engine::{Pipeline, PipelineOutcome};
//!
//! let pipeline = Pipeline::from_config(config);
//! match pipeline.run(&git, forge.as_ref()).await? {
//!     PipelineOutcome::NoChanges => println!("nothing to publish"),
//!     PipelineOutcome::DryRun { files } => println!("would publish {} files", files.len()),
//!     PipelineOutcome::Published { commit, .. } => println!("published {}", commit),
//! }
//! ```

pub mod detect;
pub mod publish;
pub mod unit;

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::core::config::PipelineConfig;
use crate::core::manifest::{self, ManifestError};
use crate::core::schema;
use crate::core::types::Oid;
use crate::forge::Forge;
use crate::git::Git;
use crate::loader::{SchemaExtractionError, SchemaLoader};

pub use detect::{ChangeDetector, ChangeSet, DetectError};
pub use publish::{AtomicPublisher, PublishError, PublishStep};
pub use unit::{is_publishable, PublishFile, PublishUnit, UnitError};

/// Fatal pipeline errors. Every variant terminates the run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] SchemaExtractionError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("plugin entry point not found: {} (did the build run?)", .0.display())]
    MissingEntry(PathBuf),

    #[error("change detection failed: {0}")]
    Detect(#[from] DetectError),

    #[error("failed to collect files to publish: {0}")]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Result of the local half of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    /// Manifest and outputs match `HEAD`.
    NoChanges,
    /// Something changed; `unit` is what would be committed.
    Ready { changes: ChangeSet, unit: PublishUnit },
}

/// How a run ended. All variants are successes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    NoChanges,
    DryRun { files: Vec<String> },
    Published { commit: Oid, files: Vec<String> },
}

/// A configured pipeline.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    loader: SchemaLoader,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, loader: SchemaLoader) -> Self {
        Self { config, loader }
    }

    /// Pipeline whose loader runs the configured JavaScript runtime.
    pub fn from_config(config: PipelineConfig) -> Self {
        let loader = SchemaLoader::node(config.node_binary.clone(), config.export_name.clone());
        Self::new(config, loader)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract the schema export as-is.
    pub fn load_schema(&self) -> Result<Value, PipelineError> {
        Ok(self.loader.load(&self.config.schema_path)?)
    }

    /// Load, normalize and merge the schema into the manifest on disk.
    ///
    /// Returns the merged manifest document. No network access.
    pub fn prepare_manifest(&self) -> Result<Value, PipelineError> {
        let schema = schema::normalize(self.load_schema()?);
        let document = manifest::merge(&self.config.manifest_path, &schema)?;
        tracing::info!(manifest = %self.config.manifest_path.display(), "manifest updated");
        Ok(document)
    }

    /// Everything short of publishing: prepare the manifest, check the
    /// build output exists, detect changes and collect the files.
    pub fn stage(&self, git: &Git) -> Result<Staged, PipelineError> {
        self.prepare_manifest()?;

        if !self.config.plugin_entry_path.is_file() {
            return Err(PipelineError::MissingEntry(
                self.config.plugin_entry_path.clone(),
            ));
        }

        let changes = ChangeDetector::new(git)
            .detect(&self.config.manifest_path, &self.config.output_dir)?;
        if !changes.has_changes() {
            tracing::info!("no changes against HEAD");
            return Ok(Staged::NoChanges);
        }

        let root = git.work_dir().map_err(DetectError::from)?;
        let unit = PublishUnit::collect(root, &self.config.manifest_path, &self.config.output_dir)?;
        tracing::info!(changed = changes.changed.len(), files = unit.len(), "staged");

        Ok(Staged::Ready { changes, unit })
    }

    /// Run the whole pipeline.
    ///
    /// `forge` is only called when there are changes and this is not a
    /// dry run.
    pub async fn run(&self, git: &Git, forge: &dyn Forge) -> Result<PipelineOutcome, PipelineError> {
        let unit = match self.stage(git)? {
            Staged::NoChanges => return Ok(PipelineOutcome::NoChanges),
            Staged::Ready { unit, .. } => unit,
        };

        if self.config.dry_run {
            return Ok(PipelineOutcome::DryRun {
                files: unit.paths(),
            });
        }

        let commit = AtomicPublisher::new(forge)
            .publish(&self.config.branch, &unit, &self.config.commit_message)
            .await?;

        Ok(PipelineOutcome::Published {
            commit,
            files: unit.paths(),
        })
    }
}
