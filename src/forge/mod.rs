//! forge
//!
//! Abstraction for the remote hosting service's git object API.
//!
//! # Architecture
//!
//! The `Forge` trait defines the four remote operations a publish needs.
//! Commands use the [`create_forge`] factory function rather than
//! constructing a specific implementation directly, and the publisher only
//! ever sees `&dyn Forge`.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST git database API
//! - [`mock`]: In-memory implementation for deterministic testing
//! - `factory`: Repository resolution and forge creation

mod factory;
pub mod github;
pub mod mock;
mod traits;

pub use factory::{create_forge, resolve_repository};
pub use traits::*;
