//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//! - [`Oid`] - Git object identifier (SHA)
//! - [`RepoSlug`] - `owner/repo` identifier on the hosting service
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, so a bad branch name from configuration fails
//! before any network call is made.
//!
//! # Examples
//!
//! ```
//! use schemaship::core::types::{BranchName, Oid, RepoSlug};
//!
//! let branch = BranchName::new("release/plugin").unwrap();
//! let oid = Oid::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! let slug: RepoSlug = "octocat/hello-world".parse().unwrap();
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! assert!(Oid::new("not-a-sha").is_err());
//! assert_eq!(slug.owner(), "octocat");
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid object id: {0}")]
    InvalidOid(String),

    #[error("invalid repository slug: {0}")]
    InvalidRepoSlug(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty or exactly `@`
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
///
/// # Example
///
/// ```
/// use schemaship::core::types::BranchName;
///
/// let name = BranchName::new("main").unwrap();
/// assert_eq!(name.as_str(), "main");
/// assert_eq!(name.ref_path(), "heads/main");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |why: &str| Err(TypeError::InvalidBranchName(format!("'{name}' {why}")));

        if name.is_empty() {
            return reject("is empty");
        }
        if name == "@" {
            return reject("is reserved");
        }
        if name.starts_with('.') || name.starts_with('-') {
            return reject("cannot start with '.' or '-'");
        }
        if name.ends_with(".lock") || name.ends_with('/') {
            return reject("cannot end with '.lock' or '/'");
        }
        for seq in ["..", "@{", "//"] {
            if name.contains(seq) {
                return reject(&format!("cannot contain '{seq}'"));
            }
        }
        if let Some(c) = name
            .chars()
            .find(|c| matches!(c, ' ' | '~' | '^' | ':' | '\\' | '?' | '*' | '['))
        {
            return reject(&format!("cannot contain '{c}'"));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("cannot contain control characters");
        }
        if name
            .split('/')
            .any(|part| part.starts_with('.') || part.ends_with(".lock"))
        {
            return reject("has a path component starting with '.' or ending with '.lock'");
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ref path as the hosting API addresses it (`heads/<branch>`).
    pub fn ref_path(&self) -> String {
        format!("heads/{}", self.0)
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl FromStr for BranchName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Git object identifier (SHA-1 or SHA-256).
///
/// OIDs are normalized to lowercase for consistency.
///
/// # Example
///
/// ```
/// use schemaship::core::types::Oid;
///
/// let oid = Oid::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(oid.as_str(), "abc123def4567890abc123def4567890abc12345");
/// assert_eq!(oid.short(7), "abc123d");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Oid(String);

impl Oid {
    /// Create a new validated object id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidOid` if the string is not a 40 or 64
    /// character hex string.
    pub fn new(oid: impl Into<String>) -> Result<Self, TypeError> {
        let oid = oid.into().to_ascii_lowercase();
        if oid.len() != 40 && oid.len() != 64 {
            return Err(TypeError::InvalidOid(format!(
                "expected 40 or 64 hex characters, got {}",
                oid.len()
            )));
        }
        if !oid.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidOid(format!("'{oid}' is not hexadecimal")));
        }
        Ok(Self(oid))
    }

    /// First `len` characters of the OID (the full OID if shorter).
    pub fn short(&self, len: usize) -> &str {
        &self.0[..len.min(self.0.len())]
    }

    /// Get the object id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Oid {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Oid> for String {
    fn from(oid: Oid) -> Self {
        oid.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Repository identifier on the hosting service (`owner/repo`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoSlug {
    owner: String,
    repo: String,
}

impl RepoSlug {
    /// Build a slug from its two halves.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepoSlug` if either half is empty or
    /// contains a `/` or whitespace.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self, TypeError> {
        let owner = owner.into();
        let repo = repo.into();
        let bad = |s: &str| s.is_empty() || s.contains('/') || s.chars().any(char::is_whitespace);
        if bad(&owner) || bad(&repo) {
            return Err(TypeError::InvalidRepoSlug(format!("{owner}/{repo}")));
        }
        Ok(Self { owner, repo })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl FromStr for RepoSlug {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, repo)) => Self::new(owner, repo),
            None => Err(TypeError::InvalidRepoSlug(s.to_string())),
        }
    }
}

impl TryFrom<String> for RepoSlug {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RepoSlug> for String {
    fn from(slug: RepoSlug) -> Self {
        slug.to_string()
    }
}

impl std::fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
