//! Relationships Module - schema metadata and lazily resolved graph nodes

pub mod loader;
pub mod metadata;
pub mod registry;

// Re-export metadata system types
pub use loader::{Node, Related};
pub use metadata::{Cardinality, EntityDescriptor, JoinSpec, RelationshipDescriptor, RelationshipLink};
pub use registry::{blog_schema, SchemaBuilder, SchemaModel};
