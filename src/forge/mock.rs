//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge keeps a tiny content-addressed object store in memory:
//! branches point at commits, commits point at trees, trees are flat maps
//! from path to file. Object ids are derived from SHA-256 of the object's
//! content, so identical trees get identical ids, just like on a real forge.
//!
//! Failure scenarios are configured with [`FailOn`], and a concurrent writer
//! can be simulated with [`MockForge::race_after_read`].
//!
//! # Example
//!
//! ```
//! use schemaship::forge::mock::MockForge;
//! use schemaship::forge::{Forge, TreeEntry};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_branch("main", &[("README.md", "hello\n")]);
//! let branch = "main".parse().unwrap();
//!
//! let head = forge.get_ref(&branch).await.unwrap();
//! let tree = forge
//!     .create_tree(&head.tree, &[TreeEntry::file("manifest.json", "{}\n")])
//!     .await
//!     .unwrap();
//! let commit = forge.create_commit("bump", &tree, &[head.commit]).await.unwrap();
//! forge.update_ref(&branch, &commit, false).await.unwrap();
//!
//! let files = forge.files_at("main").unwrap();
//! assert_eq!(files["README.md"], "hello\n");
//! assert_eq!(files["manifest.json"], "{}\n");
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use super::traits::{FileMode, Forge, ForgeError, RefInfo, TreeEntry};
use crate::core::types::{BranchName, Oid};

/// A file stored in a mock tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockFile {
    pub mode: FileMode,
    pub content: String,
}

/// A commit stored in the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    pub message: String,
    pub tree: Oid,
    pub parents: Vec<Oid>,
}

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockForgeInner {
    /// Branch heads.
    branches: HashMap<String, Oid>,
    /// Commit objects by id.
    commits: HashMap<Oid, MockCommit>,
    /// Tree objects by id.
    trees: HashMap<Oid, BTreeMap<String, MockFile>>,
    /// Commits created so far; mixed into commit ids so they stay unique.
    commit_counter: u64,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Files a simulated concurrent writer pushes right after the next read.
    race: Option<Vec<TreeEntry>>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail get_ref with the given error.
    GetRef(ForgeError),
    /// Fail create_tree with the given error.
    CreateTree(ForgeError),
    /// Fail create_commit with the given error.
    CreateCommit(ForgeError),
    /// Fail update_ref with the given error.
    UpdateRef(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetRef {
        branch: String,
    },
    CreateTree {
        base_tree: Oid,
        paths: Vec<String>,
    },
    CreateCommit {
        message: String,
        tree: Oid,
        parents: Vec<Oid>,
    },
    UpdateRef {
        branch: String,
        commit: Oid,
        force: bool,
    },
}

impl MockForge {
    /// Create a new empty mock forge with no branches.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner::default())),
        }
    }

    /// Add a branch whose single root commit contains `files`.
    ///
    /// # Panics
    ///
    /// Panics if `branch` is not a valid branch name.
    pub fn with_branch(self, branch: &str, files: &[(&str, &str)]) -> Self {
        let branch = BranchName::new(branch).expect("valid branch name");
        {
            let mut inner = self.inner.lock().unwrap();
            let entries: Vec<TreeEntry> = files
                .iter()
                .map(|(path, content)| TreeEntry::file(*path, *content))
                .collect();
            let tree = inner.store_tree(BTreeMap::new(), &entries);
            let commit = inner.store_commit("initial commit", tree, Vec::new());
            inner.branches.insert(branch.to_string(), commit);
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use schemaship::forge::mock::{MockForge, FailOn};
    /// use schemaship::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreateCommit(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Simulate another writer: right after the next `get_ref`, push a
    /// commit with `files` on top of the branch that was just read.
    pub fn race_after_read(self, files: &[(&str, &str)]) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.race = Some(
                files
                    .iter()
                    .map(|(path, content)| TreeEntry::file(*path, *content))
                    .collect(),
            );
        }
        self
    }

    /// Push a commit with `files` layered on the current head of `branch`.
    ///
    /// Returns `None` if the branch does not exist.
    pub fn push(&self, branch: &str, message: &str, files: &[TreeEntry]) -> Option<Oid> {
        let mut inner = self.inner.lock().unwrap();
        inner.push(branch, message, files)
    }

    /// Get all recorded operations.
    ///
    /// Useful for verifying the mock was called correctly.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Current head of a branch (for test verification).
    pub fn branch_head(&self, branch: &str) -> Option<Oid> {
        let inner = self.inner.lock().unwrap();
        inner.branches.get(branch).cloned()
    }

    /// Get a commit by id (for test verification).
    pub fn commit(&self, oid: &Oid) -> Option<MockCommit> {
        let inner = self.inner.lock().unwrap();
        inner.commits.get(oid).cloned()
    }

    /// Get the files of a tree by id (for test verification).
    pub fn tree_files(&self, oid: &Oid) -> Option<BTreeMap<String, MockFile>> {
        let inner = self.inner.lock().unwrap();
        inner.trees.get(oid).cloned()
    }

    /// Path to content map of the tree at the head of `branch`.
    pub fn files_at(&self, branch: &str) -> Option<BTreeMap<String, String>> {
        let inner = self.inner.lock().unwrap();
        let head = inner.branches.get(branch)?;
        let commit = inner.commits.get(head)?;
        let tree = inner.trees.get(&commit.tree)?;
        Some(
            tree.iter()
                .map(|(path, file)| (path.clone(), file.content.clone()))
                .collect(),
        )
    }

    /// Number of commits in the store (for test verification).
    pub fn commit_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.commits.len()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Result<(), ForgeError> {
        let inner = self.inner.lock().unwrap();
        match &inner.fail_on {
            Some(FailOn::GetRef(e)) if expected == "get_ref" => Err(e.clone()),
            Some(FailOn::CreateTree(e)) if expected == "create_tree" => Err(e.clone()),
            Some(FailOn::CreateCommit(e)) if expected == "create_commit" => Err(e.clone()),
            Some(FailOn::UpdateRef(e)) if expected == "update_ref" => Err(e.clone()),
            _ => Ok(()),
        }
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockForgeInner {
    /// Store a tree made of `base` overlaid with `entries`.
    fn store_tree(&mut self, mut base: BTreeMap<String, MockFile>, entries: &[TreeEntry]) -> Oid {
        for entry in entries {
            base.insert(
                entry.path.clone(),
                MockFile {
                    mode: entry.mode,
                    content: entry.content.clone(),
                },
            );
        }

        let mut hasher = Sha256::new();
        hasher.update(b"tree\0");
        for (path, file) in &base {
            hasher.update(file.mode.as_str().as_bytes());
            hasher.update(b" ");
            hasher.update(path.as_bytes());
            hasher.update(b"\0");
            hasher.update(Sha256::digest(file.content.as_bytes()));
        }
        let oid = digest_oid(hasher);
        self.trees.insert(oid.clone(), base);
        oid
    }

    fn store_commit(&mut self, message: &str, tree: Oid, parents: Vec<Oid>) -> Oid {
        self.commit_counter += 1;

        let mut hasher = Sha256::new();
        hasher.update(b"commit\0");
        hasher.update(self.commit_counter.to_be_bytes());
        hasher.update(tree.as_str().as_bytes());
        for parent in &parents {
            hasher.update(parent.as_str().as_bytes());
        }
        hasher.update(message.as_bytes());
        let oid = digest_oid(hasher);

        self.commits.insert(
            oid.clone(),
            MockCommit {
                message: message.to_string(),
                tree,
                parents,
            },
        );
        oid
    }

    fn push(&mut self, branch: &str, message: &str, files: &[TreeEntry]) -> Option<Oid> {
        let head = self.branches.get(branch)?.clone();
        let base_tree = self.commits.get(&head)?.tree.clone();
        let base = self.trees.get(&base_tree)?.clone();
        let tree = self.store_tree(base, files);
        let commit = self.store_commit(message, tree, vec![head]);
        self.branches.insert(branch.to_string(), commit.clone());
        Some(commit)
    }

    /// Whether `ancestor` is reachable from `commit` (inclusive).
    fn is_ancestor(&self, ancestor: &Oid, commit: &Oid) -> bool {
        let mut seen = HashSet::new();
        let mut stack = vec![commit.clone()];
        while let Some(oid) = stack.pop() {
            if &oid == ancestor {
                return true;
            }
            if !seen.insert(oid.clone()) {
                continue;
            }
            if let Some(c) = self.commits.get(&oid) {
                stack.extend(c.parents.iter().cloned());
            }
        }
        false
    }
}

/// First 20 bytes of a SHA-256 digest, as a 40 character hex id.
fn digest_oid(hasher: Sha256) -> Oid {
    let digest = hasher.finalize();
    Oid::new(hex::encode(&digest[..20])).expect("hex digest is a valid oid")
}

fn unprocessable(message: impl Into<String>) -> ForgeError {
    ForgeError::ApiError {
        status: 422,
        message: message.into(),
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_ref(&self, branch: &BranchName) -> Result<RefInfo, ForgeError> {
        self.record(MockOperation::GetRef {
            branch: branch.to_string(),
        });
        self.check_fail("get_ref")?;

        let mut inner = self.inner.lock().unwrap();
        let commit = inner
            .branches
            .get(branch.as_str())
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("refs/{}", branch.ref_path())))?;
        let tree = inner
            .commits
            .get(&commit)
            .map(|c| c.tree.clone())
            .ok_or_else(|| ForgeError::NotFound(format!("commit {}", commit)))?;

        if let Some(files) = inner.race.take() {
            inner.push(branch.as_str(), "concurrent update", &files);
        }

        Ok(RefInfo {
            branch: branch.clone(),
            commit,
            tree,
        })
    }

    async fn create_tree(&self, base_tree: &Oid, entries: &[TreeEntry]) -> Result<Oid, ForgeError> {
        self.record(MockOperation::CreateTree {
            base_tree: base_tree.clone(),
            paths: entries.iter().map(|e| e.path.clone()).collect(),
        });
        self.check_fail("create_tree")?;

        let mut inner = self.inner.lock().unwrap();
        let base = inner
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| unprocessable(format!("base_tree {} does not exist", base_tree)))?;
        Ok(inner.store_tree(base, entries))
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &Oid,
        parents: &[Oid],
    ) -> Result<Oid, ForgeError> {
        self.record(MockOperation::CreateCommit {
            message: message.to_string(),
            tree: tree.clone(),
            parents: parents.to_vec(),
        });
        self.check_fail("create_commit")?;

        let mut inner = self.inner.lock().unwrap();
        if !inner.trees.contains_key(tree) {
            return Err(unprocessable(format!("tree {} does not exist", tree)));
        }
        if let Some(missing) = parents.iter().find(|p| !inner.commits.contains_key(*p)) {
            return Err(unprocessable(format!("parent {} does not exist", missing)));
        }
        Ok(inner.store_commit(message, tree.clone(), parents.to_vec()))
    }

    async fn update_ref(
        &self,
        branch: &BranchName,
        commit: &Oid,
        force: bool,
    ) -> Result<(), ForgeError> {
        self.record(MockOperation::UpdateRef {
            branch: branch.to_string(),
            commit: commit.clone(),
            force,
        });
        self.check_fail("update_ref")?;

        let mut inner = self.inner.lock().unwrap();
        if !inner.commits.contains_key(commit) {
            return Err(unprocessable(format!("object {} does not exist", commit)));
        }
        let current = inner
            .branches
            .get(branch.as_str())
            .cloned()
            .ok_or_else(|| unprocessable("Reference does not exist"))?;

        if !force && !inner.is_ancestor(&current, commit) {
            return Err(unprocessable("Update is not a fast forward"));
        }

        inner.branches.insert(branch.to_string(), commit.clone());
        Ok(())
    }
}
