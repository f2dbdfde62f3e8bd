//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module is the **single doorway** to the local repository. The
//! change detector stages candidate files and asks whether the staged set
//! differs from `HEAD`; the forge factory reads the `origin` URL. Nothing
//! else in the crate imports `git2`.
//!
//! # Error Handling
//!
//! Git errors are categorized into typed variants:
//! - [`GitError::NotARepo`]: Not inside a Git repository
//! - [`GitError::BareRepo`]: No working directory to stage from
//! - [`GitError::OutsideWorkdir`]: A path is not inside the working tree
//! - [`GitError::Internal`]: Anything libgit2 reports
//!
//! # Example
//!
//! ```ignore
//! use schemaship::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! git.stage_paths(&["manifest.json".to_string()])?;
//! let changed = git.staged_changes(&["manifest.json".to_string()])?;
//! ```

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// A path that must live in the working tree does not.
    #[error("path is outside the working tree: {path}")]
    OutsideWorkdir {
        /// The offending path
        path: PathBuf,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    fn from_git2(err: git2::Error, context: &str) -> Self {
        GitError::Internal {
            message: format!("{}: {}", context, err.message()),
        }
    }
}

/// The Git interface.
///
/// This is the **single point of interaction** with the local repository.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    // =========================================================================
    // Repository Opening
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Path to the working tree root.
    pub fn work_dir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    /// Express `path` relative to the working tree, with `/` separators.
    ///
    /// Relative inputs are taken as already relative to the working tree.
    pub fn relative_path(&self, path: &Path) -> Result<String, GitError> {
        let work_dir = self.work_dir()?;
        let relative = if path.is_absolute() {
            let canonical_root = work_dir
                .canonicalize()
                .unwrap_or_else(|_| work_dir.to_path_buf());
            let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
            canonical
                .strip_prefix(&canonical_root)
                .or_else(|_| path.strip_prefix(work_dir))
                .map(Path::to_path_buf)
                .map_err(|_| GitError::OutsideWorkdir {
                    path: path.to_path_buf(),
                })?
        } else {
            path.to_path_buf()
        };

        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => {
                    return Err(GitError::OutsideWorkdir {
                        path: path.to_path_buf(),
                    })
                }
            }
        }

        if parts.is_empty() {
            return Err(GitError::OutsideWorkdir {
                path: path.to_path_buf(),
            });
        }

        Ok(parts.join("/"))
    }

    // =========================================================================
    // Index
    // =========================================================================

    /// Add the given working-tree paths to the index and write it.
    ///
    /// Paths are repository-relative with `/` separators. Ignore rules do not
    /// apply: build output is often ignored locally but still published.
    pub fn stage_paths(&self, paths: &[String]) -> Result<(), GitError> {
        let mut index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "index"))?;

        for path in paths {
            index
                .add_path(Path::new(path))
                .map_err(|e| GitError::from_git2(e, path))?;
        }

        index
            .write()
            .map_err(|e| GitError::from_git2(e, "index write"))
    }

    /// Which of `paths` differ between the index and the `HEAD` tree.
    ///
    /// With an unborn `HEAD` every staged path counts as changed.
    pub fn staged_changes(&self, paths: &[String]) -> Result<Vec<String>, GitError> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }

        let index = self
            .repo
            .index()
            .map_err(|e| GitError::from_git2(e, "index"))?;

        let head_tree = match self.repo.head() {
            Ok(head) => Some(
                head.peel_to_tree()
                    .map_err(|e| GitError::from_git2(e, "HEAD tree"))?,
            ),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                None
            }
            Err(e) => return Err(GitError::from_git2(e, "HEAD")),
        };

        let mut opts = git2::DiffOptions::new();
        opts.disable_pathspec_match(true);
        for path in paths {
            opts.pathspec(path.as_str());
        }

        let diff = self
            .repo
            .diff_tree_to_index(head_tree.as_ref(), Some(&index), Some(&mut opts))
            .map_err(|e| GitError::from_git2(e, "diff"))?;

        let mut changed: Vec<String> = diff
            .deltas()
            .filter_map(|delta| {
                delta
                    .new_file()
                    .path()
                    .or_else(|| delta.old_file().path())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        changed.sort();
        changed.dedup();

        Ok(changed)
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Get the URL for a remote.
    ///
    /// Returns `None` if the remote doesn't exist.
    pub fn remote_url(&self, name: &str) -> Result<Option<String>, GitError> {
        match self.repo.find_remote(name) {
            Ok(remote) => Ok(remote.url().map(String::from)),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(GitError::from_git2(e, name)),
        }
    }
}
