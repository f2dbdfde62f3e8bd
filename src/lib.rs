//! schemaship - publish a plugin's settings schema and build output
//!
//! schemaship extracts a settings schema from a freshly built plugin module,
//! normalizes it into the plugin manifest, and commits the manifest together
//! with the build output to a remote branch as a single revision, using the
//! hosting service's git object API rather than a local commit and push.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Load -> Normalize -> Merge -> Detect -> Publish
//! - [`loader`] - Format-agnostic extraction of the schema export
//! - [`core`] - Domain types, configuration, schema normalization, manifest merge
//! - [`git`] - Single interface for local Git operations
//! - [`forge`] - Hosting API abstraction (GitHub, in-memory mock)
//! - [`ui`] - User-facing output
//!
//! # Guarantees
//!
//! 1. A schema that cannot be extracted fails the run; nothing is published
//! 2. The manifest is rewritten atomically or not at all
//! 3. Nothing is sent to the remote when the files match `HEAD`
//! 4. A publish is one commit whose tree is layered on the branch's tree

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod git;
pub mod loader;
pub mod ui;
