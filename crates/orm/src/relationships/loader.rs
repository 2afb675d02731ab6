//! Materialized graph nodes and their lazily resolved relationships

use std::collections::BTreeMap;

use serde_json::{Map, Value as JsonValue};

use super::registry::SchemaModel;
use crate::record::{Key, Record};

/// A relationship slot on a node
///
/// Starts `Unresolved`; becomes `Loaded` exactly once, either eagerly during
/// a load or on first access through a load session. A belongs-to
/// relationship is loaded as a collection of zero or one node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Related {
    #[default]
    Unresolved,
    Loaded(Vec<Node>),
}

impl Related {
    /// Check if the relationship has been loaded
    pub fn is_loaded(&self) -> bool {
        matches!(self, Related::Loaded(_))
    }

    /// Loaded nodes, or `None` while unresolved
    pub fn nodes(&self) -> Option<&[Node]> {
        match self {
            Related::Loaded(nodes) => Some(nodes),
            Related::Unresolved => None,
        }
    }

    pub fn nodes_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Related::Loaded(nodes) => Some(nodes),
            Related::Unresolved => None,
        }
    }

    /// Set a loaded value
    pub fn set(&mut self, nodes: Vec<Node>) {
        *self = Related::Loaded(nodes);
    }

    /// Take the loaded nodes, leaving the slot unresolved
    pub fn take(&mut self) -> Option<Vec<Node>> {
        match std::mem::take(self) {
            Related::Loaded(nodes) => Some(nodes),
            Related::Unresolved => None,
        }
    }

    pub fn clear(&mut self) {
        *self = Related::Unresolved;
    }
}

/// A record plus one slot per relationship its entity declares
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub record: Record,
    relations: BTreeMap<String, Related>,
}

impl Node {
    /// A node with every declared relationship unresolved
    pub fn unresolved(record: Record, schema: &SchemaModel) -> Self {
        let relations = schema
            .relationships_of(&record.entity)
            .map(|rels| {
                rels.iter()
                    .map(|r| (r.name.clone(), Related::Unresolved))
                    .collect()
            })
            .unwrap_or_default();
        Self { record, relations }
    }

    pub fn key(&self) -> Key {
        self.record.key
    }

    pub fn entity(&self) -> &str {
        &self.record.entity
    }

    /// The slot for a relationship, `None` if the entity does not declare it
    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    pub fn relation_mut(&mut self, name: &str) -> Option<&mut Related> {
        self.relations.get_mut(name)
    }

    pub fn relations(&self) -> impl Iterator<Item = (&str, &Related)> {
        self.relations.iter().map(|(name, related)| (name.as_str(), related))
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.relations.get(name).is_some_and(Related::is_loaded)
    }

    /// Loaded related nodes, or `None` if unknown or unresolved
    pub fn loaded(&self, name: &str) -> Option<&[Node]> {
        self.relations.get(name).and_then(Related::nodes)
    }

    /// The single loaded target of a belongs-to relationship
    pub fn single(&self, name: &str) -> Option<&Node> {
        self.loaded(name).and_then(|nodes| nodes.first())
    }

    /// Follow a dotted chain of loaded relationships and collect the nodes at its end
    pub fn descend(&self, path: &str) -> Vec<&Node> {
        let mut level = vec![self];
        for name in path.split('.') {
            level = level
                .into_iter()
                .filter_map(|node| node.loaded(name))
                .flatten()
                .collect();
        }
        level
    }

    /// Mark a relationship loaded. Unknown names are ignored.
    pub fn set_loaded(&mut self, name: &str, nodes: Vec<Node>) {
        if let Some(slot) = self.relations.get_mut(name) {
            slot.set(nodes);
        }
    }

    /// Record fields plus every loaded relationship, nested
    pub fn to_json(&self) -> JsonValue {
        let mut object: Map<String, JsonValue> = self.record.fields.clone();
        for (name, related) in &self.relations {
            if let Related::Loaded(nodes) = related {
                object.insert(
                    name.clone(),
                    JsonValue::Array(nodes.iter().map(Node::to_json).collect()),
                );
            }
        }
        JsonValue::Object(object)
    }
}
