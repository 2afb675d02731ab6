//! Root queries, pushed-down predicates and relationship paths

pub mod builder;
pub mod types;
pub mod where_clause;
pub mod with;

pub use builder::{RootQuery, RootSelection};
pub use types::{compare_values, Predicate, QueryOperator};
pub use where_clause::Filterable;
pub use with::{PathSegment, RelationshipPath};
