//! vm-core: shared types, IDs, errors, configuration, and event system.
//!
//! This crate is the foundational dependency for all other vm-* crates,
//! providing type-safe identifiers, a unified error type, the media item
//! model with its version-linkage attributes, the [`Catalog`] contract the
//! consolidation engine talks to, application configuration, and a
//! broadcast event bus.

pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod ids;
pub mod item;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use catalog::{Catalog, ItemQuery};
pub use error::{Error, Result};
pub use ids::*;
pub use item::{LinkedVersion, MediaItem};
pub use media::*;
