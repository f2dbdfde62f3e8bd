//! core
//!
//! Core domain types and pure transforms.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, RepoSlug
//! - [`config`] - Pipeline configuration and loading
//! - [`schema`] - Settings schema normalization
//! - [`manifest`] - Folding the schema into the plugin manifest
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at construction time
//! - Nothing in here touches the network
//! - Transforms are deterministic

pub mod config;
pub mod manifest;
pub mod schema;
pub mod types;
