//! WHERE-style shorthands for root queries and relationship paths

use serde_json::Value;

use super::builder::RootQuery;
use super::types::{Predicate, QueryOperator};
use super::with::RelationshipPath;

/// Anything that accepts a pushed-down predicate
pub trait Filterable: Sized {
    fn and_where(self, predicate: Predicate) -> Self;

    /// Add WHERE condition with equality
    fn where_eq<T: Into<Value>>(self, attribute: &str, value: T) -> Self {
        self.and_where(Predicate::compare(attribute, QueryOperator::Equal, value))
    }

    /// Add WHERE condition with not equal
    fn where_ne<T: Into<Value>>(self, attribute: &str, value: T) -> Self {
        self.and_where(Predicate::compare(attribute, QueryOperator::NotEqual, value))
    }

    /// Add WHERE condition with greater than
    fn where_gt<T: Into<Value>>(self, attribute: &str, value: T) -> Self {
        self.and_where(Predicate::compare(attribute, QueryOperator::GreaterThan, value))
    }

    /// Add WHERE condition with greater than or equal
    fn where_gte<T: Into<Value>>(self, attribute: &str, value: T) -> Self {
        self.and_where(Predicate::compare(attribute, QueryOperator::GreaterThanOrEqual, value))
    }

    /// Add WHERE condition with less than
    fn where_lt<T: Into<Value>>(self, attribute: &str, value: T) -> Self {
        self.and_where(Predicate::compare(attribute, QueryOperator::LessThan, value))
    }

    /// Add WHERE condition with less than or equal
    fn where_lte<T: Into<Value>>(self, attribute: &str, value: T) -> Self {
        self.and_where(Predicate::compare(attribute, QueryOperator::LessThanOrEqual, value))
    }
}

impl Filterable for RootQuery {
    fn and_where(self, predicate: Predicate) -> Self {
        self.filter(predicate)
    }
}

impl Filterable for RelationshipPath {
    fn and_where(self, predicate: Predicate) -> Self {
        self.filter(predicate)
    }
}
