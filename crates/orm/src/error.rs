//! Error types for the loader
//!
//! Three layers of failure: static schema configuration, caller mistakes in
//! relationship paths, and data source failures surfaced while loading.

use std::time::Duration;

use crate::record::Key;

/// Result type alias for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Result type alias for data source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Static schema configuration is inconsistent. Fatal at startup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("Entity '{0}' is declared more than once")]
    DuplicateEntity(String),

    #[error("Relationship '{relationship}' is declared more than once on '{entity}'")]
    DuplicateRelationship { entity: String, relationship: String },

    #[error("Relationship '{entity}.{relationship}' targets unknown entity '{target}'")]
    UnknownTarget {
        entity: String,
        relationship: String,
        target: String,
    },

    #[error("Relationship '{entity}.{relationship}' uses foreign key '{attribute}' which does not exist on '{dependent}'")]
    DanglingForeignKey {
        entity: String,
        relationship: String,
        dependent: String,
        attribute: String,
    },

    #[error("Relationship '{entity}.{relationship}' has an invalid join: {reason}")]
    InvalidJoin {
        entity: String,
        relationship: String,
        reason: String,
    },

    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),
}

/// Failures reported by a data source adapter
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Round trip timed out after {0:?}")]
    Timeout(Duration),

    #[error("Unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Record {key} not found in '{entity}'")]
    NotFound { entity: String, key: Key },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Serialization(err.to_string())
    }
}

/// A data source failure tied to the relationship path and key being resolved
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Failed to load '{path}'{}: {source}", .key.map(|k| format!(" for key {}", k)).unwrap_or_default())]
pub struct LoadError {
    /// Relationship path being resolved; empty for the root fetch
    pub path: String,
    /// Entity key being resolved, if the failure is attributable to one
    pub key: Option<Key>,
    #[source]
    pub source: SourceError,
}

impl LoadError {
    pub fn new(path: impl Into<String>, key: Option<Key>, source: SourceError) -> Self {
        Self {
            path: path.into(),
            key,
            source,
        }
    }
}

/// Error returned to callers of the loading engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoaderError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("Unknown relationship '{relationship}' on '{entity}'")]
    UnknownRelationship { entity: String, relationship: String },

    #[error("Invalid relationship path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Unknown loading strategy '{0}', expected lazy, eager, explicit or batch")]
    UnknownStrategy(String),

    #[error("Load cancelled before the next round trip")]
    Cancelled,
}

impl LoaderError {
    /// Returns true if the failure happened before any round trip was issued
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            LoaderError::Schema(_)
                | LoaderError::UnknownRelationship { .. }
                | LoaderError::InvalidPath(_)
                | LoaderError::UnknownStrategy(_)
        )
    }
}

/// Configuration loading errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {field}, expected {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_display_includes_path_and_key() {
        let err = LoadError::new(
            "Posts.Comments",
            Some(7),
            SourceError::Connection("reset by peer".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Failed to load 'Posts.Comments' for key 7: Connection error: reset by peer"
        );

        let root = LoadError::new("", None, SourceError::Timeout(Duration::from_millis(5)));
        assert_eq!(root.to_string(), "Failed to load '': Round trip timed out after 5ms");
    }

    #[test]
    fn test_static_errors() {
        let unknown = LoaderError::UnknownRelationship {
            entity: "Blog".to_string(),
            relationship: "NoSuchRelationship".to_string(),
        };
        assert!(unknown.is_static());
        assert!(!LoaderError::Cancelled.is_static());
        assert!(LoaderError::from(SchemaError::UnknownEntity("X".to_string())).is_static());
        assert!(LoaderError::UnknownStrategy("greedy".to_string()).is_static());
    }
}
