//! Projections - selected root fields plus per-relationship summaries
//!
//! A summary reports how many related records a root has and the first few
//! of them in a given order, restricted to selected fields. Each summarized
//! relationship costs one round trip for the whole root set.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::{LoaderError, LoaderResult, SchemaError};
use crate::loading::{IncludeNode, LevelFetch, LoadSession, Loader};
use crate::query::{compare_values, Predicate, RootQuery};
use crate::relationships::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Count and top-N of one relationship
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipSummary {
    pub relationship: String,
    /// Output field holding the count; `None` omits it
    pub count_as: Option<String>,
    /// Output field holding the top records
    pub top_as: String,
    pub limit: usize,
    pub order_by: Option<(String, SortDirection)>,
    /// Fields kept on each top record; empty keeps all
    pub fields: Vec<String>,
    pub filter: Option<Predicate>,
}

impl RelationshipSummary {
    pub fn new(relationship: &str) -> Self {
        Self {
            relationship: relationship.to_string(),
            count_as: Some(format!("{}Count", relationship)),
            top_as: relationship.to_string(),
            limit: 0,
            order_by: None,
            fields: Vec::new(),
            filter: None,
        }
    }

    pub fn count_as(mut self, field: &str) -> Self {
        self.count_as = Some(field.to_string());
        self
    }

    pub fn without_count(mut self) -> Self {
        self.count_as = None;
        self
    }

    /// Keep the first `limit` records under `field`
    pub fn top(mut self, limit: usize, field: &str) -> Self {
        self.limit = limit;
        self.top_as = field.to_string();
        self
    }

    pub fn order_by(mut self, attribute: &str, direction: SortDirection) -> Self {
        self.order_by = Some((attribute.to_string(), direction));
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(Predicate::combine(self.filter.take(), predicate));
        self
    }

    fn summarize(&self, related: &[Node]) -> (Option<JsonValue>, Option<JsonValue>) {
        let count = self.count_as.as_ref().map(|_| JsonValue::from(related.len()));
        if self.limit == 0 {
            return (count, None);
        }

        let mut ordered: Vec<&Node> = related.iter().collect();
        if let Some((attribute, direction)) = &self.order_by {
            ordered.sort_by(|a, b| {
                let ord = match (a.record.get(attribute), b.record.get(attribute)) {
                    (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                match direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
        }

        let top = ordered
            .into_iter()
            .take(self.limit)
            .map(|node| {
                if self.fields.is_empty() {
                    JsonValue::Object(node.record.fields.clone())
                } else {
                    JsonValue::Object(node.record.select(&self.fields))
                }
            })
            .collect();
        (count, Some(JsonValue::Array(top)))
    }
}

/// Root fields to select and relationships to summarize
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub fields: Vec<String>,
    pub summaries: Vec<RelationshipSummary>,
}

impl Projection {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
            summaries: Vec::new(),
        }
    }

    pub fn summarize(mut self, summary: RelationshipSummary) -> Self {
        self.summaries.push(summary);
        self
    }
}

/// Projected rows plus the session that produced them
pub struct ProjectionOutcome {
    pub rows: Vec<JsonValue>,
    pub session: LoadSession,
}

impl ProjectionOutcome {
    pub fn round_trips(&self) -> usize {
        self.session.round_trips()
    }
}

impl Loader {
    /// Fetch roots and summarize relationships: 1 + one round trip per summary
    pub async fn project(&self, root: RootQuery, projection: &Projection) -> LoaderResult<ProjectionOutcome> {
        if self.schema().entity(&root.entity).is_none() {
            return Err(SchemaError::UnknownEntity(root.entity.clone()).into());
        }
        let includes = projection
            .summaries
            .iter()
            .map(|summary| {
                self.schema()
                    .relationship(&root.entity, &summary.relationship)
                    .map(|descriptor| IncludeNode::leaf(descriptor.clone(), summary.filter.clone()))
                    .ok_or_else(|| LoaderError::UnknownRelationship {
                        entity: root.entity.clone(),
                        relationship: summary.relationship.clone(),
                    })
            })
            .collect::<LoaderResult<Vec<_>>>()?;

        let session = self.session();
        let mut roots = session.fetch_roots(&root).await?;
        for include in &includes {
            session.eager().load_level(&mut roots, include, LevelFetch::KeySet).await?;
        }

        let rows = roots
            .iter()
            .map(|node| {
                let mut row: Map<String, JsonValue> = if projection.fields.is_empty() {
                    node.record.fields.clone()
                } else {
                    node.record.select(&projection.fields)
                };
                for summary in &projection.summaries {
                    let related = node.loaded(&summary.relationship).unwrap_or_default();
                    let (count, top) = summary.summarize(related);
                    if let (Some(field), Some(count)) = (&summary.count_as, count) {
                        row.insert(field.clone(), count);
                    }
                    if let Some(top) = top {
                        row.insert(summary.top_as.clone(), top);
                    }
                }
                JsonValue::Object(row)
            })
            .collect();

        tracing::info!(
            entity = %root.entity,
            summaries = projection.summaries.len(),
            round_trips = session.round_trips(),
            "Projection complete"
        );
        Ok(ProjectionOutcome { rows, session })
    }
}
