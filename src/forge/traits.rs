//! forge::traits
//!
//! Forge trait definition for the hosting service's git object API.
//!
//! # Design
//!
//! The publish protocol needs exactly four remote operations: read a branch,
//! write a tree on top of a base tree, write a commit, and move the branch.
//! The trait is async because every one of them is a network round trip.
//! All methods return `Result` and none of them retry.
//!
//! # Example
//!
//! ```ignore
//! use schemaship::forge::{Forge, TreeEntry};
//!
//! async fn bump(forge: &dyn Forge, branch: &BranchName) -> Result<Oid, ForgeError> {
//!     let head = forge.get_ref(branch).await?;
//!     let tree = forge
//!         .create_tree(&head.tree, &[TreeEntry::file("manifest.json", "{}\n")])
//!         .await?;
//!     let commit = forge.create_commit("bump", &tree, &[head.commit]).await?;
//!     forge.update_ref(branch, &commit, true).await?;
//!     Ok(commit)
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BranchName, Oid};

/// Errors from forge operations.
///
/// These error types map to common failure modes when talking to a
/// hosting service's REST API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The API answered with something we could not interpret.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Could not work out which hosted repository to talk to.
    #[error("unknown repository: {0}")]
    UnknownRepository(String),
}

/// Git file mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FileMode {
    /// Regular file
    #[default]
    #[serde(rename = "100644")]
    Blob,
    /// Executable file
    #[serde(rename = "100755")]
    Executable,
}

impl FileMode {
    /// Octal mode string as git and the API spell it.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Blob => "100644",
            FileMode::Executable => "100755",
        }
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A branch as read from the forge: its head commit and that commit's tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefInfo {
    /// Branch that was resolved
    pub branch: BranchName,
    /// Head commit of the branch
    pub commit: Oid,
    /// Tree the head commit points to
    pub tree: Oid,
}

/// A file to write into a new tree, with literal content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Repository-relative path with `/` separators
    pub path: String,
    /// File mode
    pub mode: FileMode,
    /// File content
    pub content: String,
}

impl TreeEntry {
    /// A regular (`100644`) file entry.
    pub fn file(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FileMode::Blob,
            content: content.into(),
        }
    }
}

/// The Forge trait for the hosting service's git object API.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Objects created by
/// [`create_tree`](Forge::create_tree) and
/// [`create_commit`](Forge::create_commit) are immutable; if a later step
/// fails they are simply left unreferenced.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Resolve a branch to its head commit and that commit's tree.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch does not exist
    async fn get_ref(&self, branch: &BranchName) -> Result<RefInfo, ForgeError>;

    /// Create a tree layered on `base_tree`.
    ///
    /// Every entry replaces (or adds) the file at its path; paths not listed
    /// are inherited from `base_tree` unchanged.
    ///
    /// # Returns
    ///
    /// The SHA of the new tree.
    async fn create_tree(&self, base_tree: &Oid, entries: &[TreeEntry]) -> Result<Oid, ForgeError>;

    /// Create a commit object pointing at `tree` with the given parents.
    ///
    /// # Returns
    ///
    /// The SHA of the new commit.
    async fn create_commit(
        &self,
        message: &str,
        tree: &Oid,
        parents: &[Oid],
    ) -> Result<Oid, ForgeError>;

    /// Move `branch` to `commit`.
    ///
    /// Without `force` the forge rejects moves that are not fast-forwards.
    /// With `force` the move is unconditional.
    async fn update_ref(
        &self,
        branch: &BranchName,
        commit: &Oid,
        force: bool,
    ) -> Result<(), ForgeError>;
}
