//! git
//!
//! Single interface for all local Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to the local repository. No other
//! module should import `git2`. The publish itself never touches the local
//! repository: commits are built remotely through [`crate::forge`]. Locally
//! we only stage candidates to find out whether anything changed, and read
//! the `origin` URL.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Staging paths into the index
//! - Diffing the index against `HEAD` for a set of paths
//! - Remote URL lookup

mod interface;

pub use interface::{Git, GitError};
