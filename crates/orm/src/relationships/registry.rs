//! Relationship Registry - The immutable schema model consulted by the loader

use std::collections::HashMap;

use super::metadata::{EntityDescriptor, JoinSpec, RelationshipDescriptor, RelationshipLink};
use crate::error::SchemaError;

/// Entity and relationship metadata, built once and shared read-only
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaModel {
    entities: HashMap<String, EntityDescriptor>,
    /// Declaration order of entity names
    order: Vec<String>,
}

impl SchemaModel {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities.get(name)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Relationships of an entity, in declaration order
    pub fn relationships_of(&self, entity: &str) -> Result<&[RelationshipDescriptor], SchemaError> {
        self.entities
            .get(entity)
            .map(|e| e.relationships.as_slice())
            .ok_or_else(|| SchemaError::UnknownEntity(entity.to_string()))
    }

    pub fn relationship(&self, entity: &str, name: &str) -> Option<&RelationshipDescriptor> {
        self.entities.get(entity)?.relationship(name)
    }

    pub fn key_attribute(&self, entity: &str) -> Option<&str> {
        self.entities.get(entity).map(|e| e.key_attribute.as_str())
    }

    /// Join tables referenced by any relationship
    pub fn join_tables(&self) -> Vec<&JoinSpec> {
        let mut joins: Vec<&JoinSpec> = Vec::new();
        for name in &self.order {
            for rel in &self.entities[name].relationships {
                if let RelationshipLink::Join(join) = &rel.link {
                    if !joins.iter().any(|j| j.table == join.table) {
                        joins.push(join);
                    }
                }
            }
        }
        joins
    }
}

/// Collects entity declarations and validates them into a [`SchemaModel`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entities: Vec<EntityDescriptor>,
    errors: Vec<SchemaError>,
}

impl SchemaBuilder {
    /// Declare an entity with its key and plain attributes
    pub fn entity(mut self, name: &str, key_attribute: &str, attributes: &[&str]) -> Self {
        if self.entities.iter().any(|e| e.name == name) {
            self.errors.push(SchemaError::DuplicateEntity(name.to_string()));
            return self;
        }
        self.entities.push(EntityDescriptor {
            name: name.to_string(),
            key_attribute: key_attribute.to_string(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            relationships: Vec::new(),
        });
        self
    }

    pub fn has_many(self, source: &str, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relationship(RelationshipDescriptor::has_many(source, name, target, foreign_key))
    }

    pub fn belongs_to(self, source: &str, name: &str, target: &str, foreign_key: &str) -> Self {
        self.relationship(RelationshipDescriptor::belongs_to(source, name, target, foreign_key))
    }

    pub fn many_to_many(self, source: &str, name: &str, target: &str, join: JoinSpec) -> Self {
        self.relationship(RelationshipDescriptor::many_to_many(source, name, target, join))
    }

    pub fn relationship(mut self, descriptor: RelationshipDescriptor) -> Self {
        let Some(owner) = self.entities.iter_mut().find(|e| e.name == descriptor.source) else {
            self.errors
                .push(SchemaError::UnknownEntity(descriptor.source.clone()));
            return self;
        };
        if owner.relationship(&descriptor.name).is_some() {
            self.errors.push(SchemaError::DuplicateRelationship {
                entity: descriptor.source.clone(),
                relationship: descriptor.name.clone(),
            });
            return self;
        }
        owner.relationships.push(descriptor);
        self
    }

    /// Validate every declaration. Reports the first inconsistency found.
    pub fn build(self) -> Result<SchemaModel, SchemaError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        let entities: HashMap<String, EntityDescriptor> = self
            .entities
            .iter()
            .map(|e| (e.name.clone(), e.clone()))
            .collect();

        for entity in &self.entities {
            for rel in &entity.relationships {
                validate_relationship(&entities, rel)?;
            }
        }

        let order = self.entities.into_iter().map(|e| e.name).collect();
        Ok(SchemaModel { entities, order })
    }
}

fn validate_relationship(
    entities: &HashMap<String, EntityDescriptor>,
    rel: &RelationshipDescriptor,
) -> Result<(), SchemaError> {
    if !entities.contains_key(&rel.target) {
        return Err(SchemaError::UnknownTarget {
            entity: rel.source.clone(),
            relationship: rel.name.clone(),
            target: rel.target.clone(),
        });
    }

    match &rel.link {
        RelationshipLink::ForeignKey { attribute } => {
            let dependent = &entities[rel.dependent()];
            if !dependent.has_attribute(attribute) {
                return Err(SchemaError::DanglingForeignKey {
                    entity: rel.source.clone(),
                    relationship: rel.name.clone(),
                    dependent: dependent.name.clone(),
                    attribute: attribute.clone(),
                });
            }
        }
        RelationshipLink::Join(join) => {
            let invalid = |reason: &str| SchemaError::InvalidJoin {
                entity: rel.source.clone(),
                relationship: rel.name.clone(),
                reason: reason.to_string(),
            };
            if join.table.is_empty() || join.owner_column.is_empty() || join.related_column.is_empty() {
                return Err(invalid("join table and columns must be named"));
            }
            if join.owner_column == join.related_column {
                return Err(invalid("owner and related columns must differ"));
            }
            if entities.contains_key(&join.table) {
                return Err(invalid("join table name collides with an entity"));
            }
        }
    }

    Ok(())
}

/// The Blog / Post / Comment / Tag schema
pub fn blog_schema() -> Result<SchemaModel, SchemaError> {
    let blog_tags = JoinSpec::new("BlogTags", "BlogId", "TagId");

    SchemaModel::builder()
        .entity("Blog", "Id", &["Title", "Description", "CreatedDate"])
        .entity("Post", "Id", &["Title", "Content", "PublishedDate", "BlogId"])
        .entity("Comment", "Id", &["Author", "Content", "CreatedDate", "PostId"])
        .entity("Tag", "Id", &["Name"])
        .has_many("Blog", "Posts", "Post", "BlogId")
        .many_to_many("Blog", "Tags", "Tag", blog_tags.clone())
        .has_many("Post", "Comments", "Comment", "PostId")
        .belongs_to("Post", "Blog", "Blog", "BlogId")
        .belongs_to("Comment", "Post", "Post", "PostId")
        .many_to_many("Tag", "Blogs", "Blog", blog_tags.inverse())
        .build()
}
