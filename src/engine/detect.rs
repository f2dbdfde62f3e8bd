//! engine::detect
//!
//! Decide whether the manifest and build output differ from `HEAD`.
//!
//! Candidates are staged into the local index and the index is diffed
//! against the `HEAD` tree, restricted to the candidate paths. Staging is
//! the only side effect. When nothing differs the publish step must be
//! skipped entirely.

use std::path::Path;

use thiserror::Error;

use super::unit::{candidate_paths, UnitError};
use crate::git::{Git, GitError};

/// Errors from change detection.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Git(#[from] GitError),
}

/// Candidate paths that differ from `HEAD`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Repository-relative paths with `/` separators, sorted
    pub changed: Vec<String>,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Change detector over the local repository.
#[derive(Debug)]
pub struct ChangeDetector<'a> {
    git: &'a Git,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(git: &'a Git) -> Self {
        Self { git }
    }

    /// Stage the manifest and publishable outputs, then report which of
    /// them differ from `HEAD`.
    pub fn detect(&self, manifest: &Path, output_dir: &Path) -> Result<ChangeSet, DetectError> {
        let candidates = candidate_paths(manifest, output_dir)?
            .iter()
            .map(|path| self.git.relative_path(path))
            .collect::<Result<Vec<_>, _>>()?;

        self.git.stage_paths(&candidates)?;
        let changed = self.git.staged_changes(&candidates)?;

        tracing::debug!(
            candidates = candidates.len(),
            changed = changed.len(),
            "change detection"
        );

        Ok(ChangeSet { changed })
    }
}
