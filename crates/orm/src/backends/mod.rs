//! Data Source Abstractions
//!
//! The loader talks to storage only through [`DataSource`]. Each invocation
//! wraps the shared source in a [`CountingSource`] that owns its round-trip
//! counter; [`InMemoryStore`] is the bundled implementation.

pub mod core;
pub mod counting;
pub mod memory;

// Re-export core traits and types
pub use core::*;
pub use counting::{CountingSource, TripContext};
pub use memory::InMemoryStore;
