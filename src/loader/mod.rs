//! loader
//!
//! Extraction of the settings schema from a compiled plugin artifact.
//!
//! # Design
//!
//! The build step may emit either an ES module or a CommonJS module, and we
//! do not know which in advance. [`SchemaLoader`] holds an ordered list of
//! [`ModuleFormat`] strategies and tries them in turn; the first one that
//! yields the named export wins.
//!
//! A strategy that loads the module but finds no such export has failed,
//! exactly like one that could not load the module at all. If every strategy
//! fails the loader returns a [`SchemaExtractionError`] carrying each
//! failure in attempt order. That error is fatal: it means the build is
//! broken, and publishing a manifest without its configuration would be
//! worse than stopping.
//!
//! # Example
//!
//! ```ignore
//! use schemaship::loader::SchemaLoader;
//! use std::path::Path;
//!
//! let loader = SchemaLoader::node("node", "pluginSettingsSchema");
//! let schema = loader.load(Path::new("dist/schema.js"))?;
//! ```

mod node;

pub use node::{ImportModule, RequireModule};

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Why a single strategy failed.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The module file does not exist.
    #[error("module not found: {0}")]
    NotFound(PathBuf),

    /// The runtime could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// The module loaded but does not export the requested name.
    #[error("module has no export named '{export}'")]
    MissingExport { export: String },

    /// The runtime exited unsuccessfully while loading the module.
    #[error("runtime exited with {status}: {stderr}")]
    Runtime { status: String, stderr: String },

    /// The export could not be read back as JSON.
    #[error("export is not valid JSON: {0}")]
    InvalidJson(String),
}

/// One strategy's failure, kept for the final report.
#[derive(Debug)]
pub struct StrategyFailure {
    /// Strategy name (e.g. "import", "require")
    pub format: &'static str,
    /// What went wrong
    pub error: LoadError,
}

impl std::fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.format, self.error)
    }
}

/// Every strategy failed to produce the schema export.
#[derive(Debug, Error)]
#[error("could not extract '{export}' from {}: {}", .path.display(), render_causes(.causes))]
pub struct SchemaExtractionError {
    /// Module that was loaded
    pub path: PathBuf,
    /// Export that was requested
    pub export: String,
    /// Failures in attempt order
    pub causes: Vec<StrategyFailure>,
}

fn render_causes(causes: &[StrategyFailure]) -> String {
    if causes.is_empty() {
        return "no load strategies configured".to_string();
    }
    causes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A way of loading a compiled module and reading one of its exports.
pub trait ModuleFormat: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Load `path` and return the JSON value bound to `export`.
    ///
    /// An absent (or `undefined`) export is an error, never `Null`.
    fn load_export(&self, path: &Path, export: &str) -> Result<Value, LoadError>;
}

/// Format-agnostic schema loader.
pub struct SchemaLoader {
    strategies: Vec<Box<dyn ModuleFormat>>,
    export: String,
}

impl std::fmt::Debug for SchemaLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaLoader")
            .field(
                "strategies",
                &self.strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("export", &self.export)
            .finish()
    }
}

impl SchemaLoader {
    /// Loader backed by a JavaScript runtime: import first, then require.
    pub fn node(program: impl Into<String>, export: impl Into<String>) -> Self {
        let program = program.into();
        let strategies: Vec<Box<dyn ModuleFormat>> = vec![
            Box::new(ImportModule::new(program.clone())),
            Box::new(RequireModule::new(program)),
        ];
        Self::with_strategies(strategies, export)
    }

    /// Loader with an explicit strategy list, tried in order.
    pub fn with_strategies(
        strategies: Vec<Box<dyn ModuleFormat>>,
        export: impl Into<String>,
    ) -> Self {
        Self {
            strategies,
            export: export.into(),
        }
    }

    /// Name of the export this loader extracts.
    pub fn export_name(&self) -> &str {
        &self.export
    }

    /// Extract the schema export from the module at `path`.
    pub fn load(&self, path: &Path) -> Result<Value, SchemaExtractionError> {
        let mut causes = Vec::with_capacity(self.strategies.len());

        if !path.exists() {
            causes.extend(self.strategies.iter().map(|s| StrategyFailure {
                format: s.name(),
                error: LoadError::NotFound(path.to_path_buf()),
            }));
            return Err(self.extraction_error(path, causes));
        }

        for strategy in &self.strategies {
            match strategy.load_export(path, &self.export) {
                Ok(value) => {
                    tracing::debug!(
                        format = strategy.name(),
                        path = %path.display(),
                        "loaded schema export"
                    );
                    return Ok(value);
                }
                Err(error) => {
                    tracing::debug!(format = strategy.name(), %error, "load attempt failed");
                    causes.push(StrategyFailure {
                        format: strategy.name(),
                        error,
                    });
                }
            }
        }

        Err(self.extraction_error(path, causes))
    }

    fn extraction_error(&self, path: &Path, causes: Vec<StrategyFailure>) -> SchemaExtractionError {
        SchemaExtractionError {
            path: path.to_path_buf(),
            export: self.export.clone(),
            causes,
        }
    }
}
