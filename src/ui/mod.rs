//! ui
//!
//! User-facing output.
//!
//! # Design
//!
//! Everything meant for the person running the tool goes through
//! [`output`]; diagnostics go through `tracing`. Both honour the same
//! `--quiet`/`--debug` flags.

pub mod output;
