//! # navload-orm: relationship loading with round-trip accounting
//!
//! Fetches a root set of entities and their related collections under an
//! explicit loading strategy (lazy, eager, explicit or batch) and counts
//! every round trip issued to the backing data source. The bundled
//! Blog / Post / Comment / Tag schema and seed data make the N+1 query
//! problem and its fixes observable.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use navload_orm::{blog_schema, InMemoryStore, LoadStrategy, Loader, RootQuery};
//! use navload_orm::seed::seed_demo_data;
//!
//! # tokio_test::block_on(async {
//! let schema = Arc::new(blog_schema().unwrap());
//! let store = Arc::new(InMemoryStore::new(schema.clone()));
//! seed_demo_data(store.as_ref()).await.unwrap();
//!
//! let loader = Loader::new(schema, store);
//! let outcome = loader
//!     .load_str(RootQuery::all("Blog"), LoadStrategy::Eager, &["Posts.Comments"])
//!     .await
//!     .unwrap();
//!
//! // One round trip for the blogs, one per include level
//! assert_eq!(outcome.round_trips(), 3);
//! assert_eq!(outcome.roots[0].descend("Posts.Comments").len(), 3);
//! # });
//! ```

pub mod backends;
pub mod config;
pub mod error;
pub mod loading;
pub mod models;
pub mod projection;
pub mod query;
pub mod record;
pub mod relationships;
pub mod seed;

// Re-export core traits and types
pub use backends::{CountingSource, DataSink, DataSource, InMemoryStore, RoundTrip, RoundTripKind};
pub use config::{EngineConfig, NavloadConfig, SourceConfig};
pub use error::*;
pub use loading::{LoadOutcome, LoadPhase, LoadSession, LoadStrategy, Loader};
pub use projection::{Projection, ProjectionOutcome, RelationshipSummary, SortDirection};
pub use query::{Filterable, Predicate, QueryOperator, RelationshipPath, RootQuery};
pub use record::{Key, Record};
pub use relationships::{blog_schema, Cardinality, Node, Related, RelationshipDescriptor, SchemaModel};
