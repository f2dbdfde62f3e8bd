//! engine::publish
//!
//! Commit a [`PublishUnit`] to a remote branch as one revision.
//!
//! # Protocol
//!
//! 1. Read the branch: head commit and its tree.
//! 2. Create a tree on top of that tree, overlaying the unit's files.
//!    Paths not in the unit are inherited.
//! 3. Create a commit for the new tree whose only parent is the head read
//!    in step 1.
//! 4. Move the branch to the new commit with `force = true`.
//!
//! The branch may move between steps 1 and 4. The forced update makes the
//! last writer win instead of failing the run; a racing publish is
//! discarded. Nothing is retried. Objects created before a failing step are
//! left unreferenced on the remote.

use std::fmt;

use thiserror::Error;

use super::unit::PublishUnit;
use crate::core::types::{BranchName, Oid};
use crate::forge::{Forge, ForgeError};

/// Step of the publish protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStep {
    ReadRef,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

impl fmt::Display for PublishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PublishStep::ReadRef => "read ref",
            PublishStep::CreateTree => "create tree",
            PublishStep::CreateCommit => "create commit",
            PublishStep::UpdateRef => "update ref",
        };
        f.write_str(name)
    }
}

/// A publish step failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("publish failed at step '{step}': {source}")]
pub struct PublishError {
    pub step: PublishStep,
    #[source]
    pub source: ForgeError,
}

impl PublishError {
    fn at(step: PublishStep) -> impl FnOnce(ForgeError) -> Self {
        move |source| Self { step, source }
    }
}

/// Publishes units through a [`Forge`].
pub struct AtomicPublisher<'a> {
    forge: &'a dyn Forge,
}

impl<'a> AtomicPublisher<'a> {
    pub fn new(forge: &'a dyn Forge) -> Self {
        Self { forge }
    }

    /// Commit `unit` on top of `branch` and move the branch to it.
    ///
    /// Returns the new commit id.
    pub async fn publish(
        &self,
        branch: &BranchName,
        unit: &PublishUnit,
        message: &str,
    ) -> Result<Oid, PublishError> {
        let head = self
            .forge
            .get_ref(branch)
            .await
            .map_err(PublishError::at(PublishStep::ReadRef))?;
        tracing::info!(
            forge = self.forge.name(),
            %branch,
            base_commit = %head.commit,
            base_tree = %head.tree,
            "read branch"
        );

        let tree = self
            .forge
            .create_tree(&head.tree, &unit.tree_entries())
            .await
            .map_err(PublishError::at(PublishStep::CreateTree))?;
        tracing::info!(%tree, files = unit.len(), "created tree");

        let commit = self
            .forge
            .create_commit(message, &tree, std::slice::from_ref(&head.commit))
            .await
            .map_err(PublishError::at(PublishStep::CreateCommit))?;
        tracing::info!(%commit, parent = %head.commit, "created commit");

        self.forge
            .update_ref(branch, &commit, true)
            .await
            .map_err(PublishError::at(PublishStep::UpdateRef))?;
        tracing::info!(%branch, %commit, "moved branch");

        Ok(commit)
    }
}
