//! Include tree - declared relationship paths merged by shared prefix
//!
//! Building the tree is where every path is validated against the schema, so
//! a bad path fails before the first round trip.

use crate::error::{LoaderError, LoaderResult, SchemaError};
use crate::query::{Predicate, RelationshipPath};
use crate::relationships::{RelationshipDescriptor, SchemaModel};

/// One relationship to load for every node of the previous level
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeNode {
    pub relationship: RelationshipDescriptor,
    /// Predicate pushed into this level's scan
    pub filter: Option<Predicate>,
    /// Dotted relationship names from the root, used for error attribution
    pub path: String,
    pub children: Vec<IncludeNode>,
}

impl IncludeNode {
    /// A single-level include with no nested relationships
    pub fn leaf(relationship: RelationshipDescriptor, filter: Option<Predicate>) -> Self {
        Self {
            path: relationship.name.clone(),
            relationship,
            filter,
            children: Vec::new(),
        }
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(IncludeNode::count).sum::<usize>()
    }
}

/// All includes of one load, rooted at an entity
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeTree {
    pub entity: String,
    pub children: Vec<IncludeNode>,
}

impl IncludeTree {
    /// Validate paths against the schema and merge them in declaration order
    pub fn build(
        schema: &SchemaModel,
        entity: &str,
        paths: &[RelationshipPath],
        max_depth: usize,
    ) -> LoaderResult<Self> {
        if schema.entity(entity).is_none() {
            return Err(SchemaError::UnknownEntity(entity.to_string()).into());
        }

        let mut tree = Self {
            entity: entity.to_string(),
            children: Vec::new(),
        };
        for path in paths {
            tree.merge(schema, path, max_depth)?;
        }
        Ok(tree)
    }

    fn merge(&mut self, schema: &SchemaModel, path: &RelationshipPath, max_depth: usize) -> LoaderResult<()> {
        if path.depth() == 0 {
            return Err(LoaderError::InvalidPath("empty relationship path".to_string()));
        }
        if path.depth() > max_depth {
            return Err(LoaderError::InvalidPath(format!(
                "'{}' is {} levels deep, the limit is {}",
                path,
                path.depth(),
                max_depth
            )));
        }

        let mut entity = self.entity.clone();
        let mut level = &mut self.children;
        let mut walked: Vec<&str> = Vec::with_capacity(path.depth());

        for segment in path.segments() {
            let descriptor = schema
                .relationship(&entity, &segment.relationship)
                .ok_or_else(|| LoaderError::UnknownRelationship {
                    entity: entity.clone(),
                    relationship: segment.relationship.clone(),
                })?;
            walked.push(&segment.relationship);

            let index = match level.iter().position(|n| n.relationship.name == segment.relationship) {
                Some(index) => {
                    let existing = &mut level[index];
                    if let (Some(a), Some(b)) = (&existing.filter, &segment.filter) {
                        if a != b {
                            return Err(LoaderError::InvalidPath(format!(
                                "'{}' is filtered differently in two paths ({} vs {})",
                                walked.join("."),
                                a,
                                b
                            )));
                        }
                    }
                    if existing.filter.is_none() {
                        existing.filter = segment.filter.clone();
                    }
                    index
                }
                None => {
                    level.push(IncludeNode {
                        relationship: descriptor.clone(),
                        filter: segment.filter.clone(),
                        path: walked.join("."),
                        children: Vec::new(),
                    });
                    level.len() - 1
                }
            };

            entity = descriptor.target.clone();
            level = &mut level[index].children;
        }
        Ok(())
    }

    /// Number of distinct relationship levels, i.e. eager round trips after the root
    pub fn node_count(&self) -> usize {
        self.children.iter().map(IncludeNode::count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
