//! forge::factory
//!
//! Forge selection and creation.
//!
//! # Design
//!
//! Commands use [`create_forge`] instead of constructing `GitHubForge`
//! directly. The hosted repository is either configured explicitly or
//! derived from the local `origin` remote; [`resolve_repository`] decides
//! which.
//!
//! # Example
//!
//! ```ignore
//! use schemaship::forge::{create_forge, resolve_repository};
//!
//! let slug = resolve_repository(None, Some("git@github.com:owner/repo.git"))?;
//! let forge = create_forge(slug, "ghp_token", "https://api.github.com");
//! ```

use super::github::{parse_github_url, GitHubForge};
use super::traits::{Forge, ForgeError};
use crate::core::types::RepoSlug;

/// Work out which hosted repository to publish to.
///
/// An explicitly configured slug wins. Otherwise the `origin` remote URL
/// must be a GitHub URL.
///
/// # Errors
///
/// `ForgeError::UnknownRepository` if neither source names a repository.
///
/// # Example
///
/// ```
/// use schemaship::forge::resolve_repository;
///
/// let slug = resolve_repository(None, Some("https://github.com/octocat/plugin.git")).unwrap();
/// assert_eq!(slug.to_string(), "octocat/plugin");
/// ```
pub fn resolve_repository(
    configured: Option<&RepoSlug>,
    remote_url: Option<&str>,
) -> Result<RepoSlug, ForgeError> {
    if let Some(slug) = configured {
        return Ok(slug.clone());
    }

    match remote_url {
        Some(url) => parse_github_url(url).ok_or_else(|| {
            ForgeError::UnknownRepository(format!(
                "could not parse '{}' as a GitHub URL. \
                 Expected format: git@github.com:owner/repo.git or https://github.com/owner/repo.git",
                url
            ))
        }),
        None => Err(ForgeError::UnknownRepository(
            "no repository configured and no 'origin' remote found".into(),
        )),
    }
}

/// Create a forge for `repository`.
///
/// This is the entry point for creating forge instances in commands.
pub fn create_forge(repository: RepoSlug, token: &str, api_base: &str) -> Box<dyn Forge> {
    Box::new(GitHubForge::with_api_base(token, repository, api_base))
}
