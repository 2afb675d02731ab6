//! Typed entities
//!
//! Records travel through the loader as JSON field maps; these types give the
//! Blog / Post / Comment / Tag data a typed shape on either side of it.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{SourceError, SourceResult};
use crate::record::{Key, Record};
use crate::relationships::Node;

pub mod blog;
pub mod comment;
pub mod post;
pub mod tag;

pub use blog::Blog;
pub use comment::Comment;
pub use post::Post;
pub use tag::Tag;

/// A typed entity convertible to and from a [`Record`]
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Debug {
    /// Entity name in the schema
    fn entity_name() -> &'static str;

    /// Key attribute name
    fn key_attribute() -> &'static str {
        "Id"
    }

    fn key(&self) -> Key;

    fn to_record(&self) -> SourceResult<Record> {
        match serde_json::to_value(self)? {
            JsonValue::Object(fields) => Ok(Record {
                entity: Self::entity_name().to_string(),
                key: self.key(),
                fields,
            }),
            other => Err(SourceError::Serialization(format!(
                "{} did not serialize to an object: {}",
                Self::entity_name(),
                other
            ))),
        }
    }

    fn from_record(record: &Record) -> SourceResult<Self>
    where
        Self: Sized,
    {
        if record.entity != Self::entity_name() {
            return Err(SourceError::Serialization(format!(
                "expected a {} record, got {}",
                Self::entity_name(),
                record.entity
            )));
        }
        let mut fields = record.fields.clone();
        fields
            .entry(Self::key_attribute())
            .or_insert_with(|| JsonValue::from(record.key));
        Ok(serde_json::from_value(JsonValue::Object(fields))?)
    }

    fn from_node(node: &Node) -> SourceResult<Self>
    where
        Self: Sized,
    {
        Self::from_record(&node.record)
    }
}

/// Decode every node of a loaded collection
pub fn decode_all<E: Entity>(nodes: &[Node]) -> SourceResult<Vec<E>> {
    nodes.iter().map(E::from_node).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_record_round_trip_uses_pascal_case() {
        let post = Post {
            id: 4,
            title: "Rust Ownership".to_string(),
            content: "Borrowing explained".to_string(),
            published_date: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            blog_id: 1,
        };

        let record = post.to_record().unwrap();
        assert_eq!(record.entity, "Post");
        assert_eq!(record.key, 4);
        assert_eq!(record.key_of("BlogId"), Some(1));
        assert_eq!(record.str_of("PublishedDate"), Some("2025-03-01T12:00:00Z"));

        assert_eq!(Post::from_record(&record).unwrap(), post);
    }

    #[test]
    fn test_key_filled_from_record_and_entity_checked() {
        let record = Record::new("Tag", 9).with("Name", "Food");
        let tag = Tag::from_record(&record).unwrap();
        assert_eq!(tag.id, 9);

        let err = Blog::from_record(&record).unwrap_err();
        assert!(matches!(err, SourceError::Serialization(_)));
    }
}
