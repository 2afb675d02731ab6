//! Dynamic records moved between the data source and the loader

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Entity key type. Every entity in this loader has a single integer key.
pub type Key = i64;

/// One row of an entity, keyed, with its attributes as JSON values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub entity: String,
    pub key: Key,
    pub fields: Map<String, JsonValue>,
}

impl Record {
    pub fn new(entity: impl Into<String>, key: Key) -> Self {
        Self {
            entity: entity.into(),
            key,
            fields: Map::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.fields.insert(attribute.into(), value.into());
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&JsonValue> {
        self.fields.get(attribute)
    }

    /// Read an attribute as a key (foreign keys, link columns)
    pub fn key_of(&self, attribute: &str) -> Option<Key> {
        self.fields.get(attribute).and_then(JsonValue::as_i64)
    }

    pub fn str_of(&self, attribute: &str) -> Option<&str> {
        self.fields.get(attribute).and_then(JsonValue::as_str)
    }

    /// Keep only the named attributes
    pub fn select(&self, attributes: &[String]) -> Map<String, JsonValue> {
        attributes
            .iter()
            .filter_map(|a| self.fields.get(a).map(|v| (a.clone(), v.clone())))
            .collect()
    }
}
