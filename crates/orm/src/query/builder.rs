//! Root query - which entities an invocation starts from

use super::types::Predicate;
use crate::record::Key;

/// How the root set is fetched
#[derive(Debug, Clone, PartialEq)]
pub enum RootSelection {
    /// Scan, optionally filtered
    Scan(Option<Predicate>),
    /// Single-record lookup by key
    Key(Key),
}

/// The root of a load: an entity type and a selection
#[derive(Debug, Clone, PartialEq)]
pub struct RootQuery {
    pub entity: String,
    pub selection: RootSelection,
}

impl RootQuery {
    /// All records of an entity
    pub fn all(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            selection: RootSelection::Scan(None),
        }
    }

    /// Records of an entity matching a predicate
    pub fn filtered(entity: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            entity: entity.into(),
            selection: RootSelection::Scan(Some(predicate)),
        }
    }

    /// At most one record, looked up by key
    pub fn by_key(entity: impl Into<String>, key: Key) -> Self {
        Self {
            entity: entity.into(),
            selection: RootSelection::Key(key),
        }
    }

    /// Add a condition to a scan. A key lookup becomes a filtered scan.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.selection = match self.selection {
            RootSelection::Scan(existing) => RootSelection::Scan(Some(Predicate::combine(existing, predicate))),
            RootSelection::Key(key) => RootSelection::Scan(Some(Predicate::Key(key).and(predicate))),
        };
        self
    }
}
