//! Relationship Metadata - Static descriptions of entities and their relationships

use serde::{Deserialize, Serialize};

/// How many related records a relationship yields per owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// Single-valued (belongs-to). Required: a missing target is a load failure.
    One,
    /// Collection-valued (has-many, many-to-many)
    Many,
}

/// Join table configuration for many-to-many relationships
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinSpec {
    /// The join table name
    pub table: String,
    /// Column holding the owner's key
    pub owner_column: String,
    /// Column holding the related record's key
    pub related_column: String,
}

impl JoinSpec {
    pub fn new(
        table: impl Into<String>,
        owner_column: impl Into<String>,
        related_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            owner_column: owner_column.into(),
            related_column: related_column.into(),
        }
    }

    /// The same join table seen from the other side
    pub fn inverse(&self) -> Self {
        Self {
            table: self.table.clone(),
            owner_column: self.related_column.clone(),
            related_column: self.owner_column.clone(),
        }
    }
}

/// What backs a relationship in storage
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipLink {
    /// A foreign key attribute. For `Many` it lives on the target, for `One`
    /// it lives on the source and references the target's key.
    ForeignKey { attribute: String },
    /// A join table (many-to-many)
    Join(JoinSpec),
}

/// Describes one named relationship of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    /// Relationship name as used in paths (e.g. "Posts")
    pub name: String,
    pub source: String,
    pub target: String,
    pub cardinality: Cardinality,
    pub link: RelationshipLink,
}

impl RelationshipDescriptor {
    pub fn has_many(
        source: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            cardinality: Cardinality::Many,
            link: RelationshipLink::ForeignKey {
                attribute: foreign_key.into(),
            },
        }
    }

    pub fn belongs_to(
        source: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            cardinality: Cardinality::One,
            link: RelationshipLink::ForeignKey {
                attribute: foreign_key.into(),
            },
        }
    }

    pub fn many_to_many(
        source: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
        join: JoinSpec,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            target: target.into(),
            cardinality: Cardinality::Many,
            link: RelationshipLink::Join(join),
        }
    }

    /// Returns true if this relationship yields a collection
    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::Many
    }

    /// The foreign key attribute, if the relationship is key-backed
    pub fn foreign_key(&self) -> Option<&str> {
        match &self.link {
            RelationshipLink::ForeignKey { attribute } => Some(attribute),
            RelationshipLink::Join(_) => None,
        }
    }

    /// The entity that carries the foreign key attribute
    pub fn dependent(&self) -> &str {
        match self.cardinality {
            Cardinality::Many => &self.target,
            Cardinality::One => &self.source,
        }
    }
}

/// Describes one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,
    pub key_attribute: String,
    pub attributes: Vec<String>,
    pub relationships: Vec<RelationshipDescriptor>,
}

impl EntityDescriptor {
    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.key_attribute == attribute || self.attributes.iter().any(|a| a == attribute)
    }

    pub fn relationship(&self, name: &str) -> Option<&RelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }
}
