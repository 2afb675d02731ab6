//! Query Types - Comparison operators and predicates pushed down to the data source

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{Key, Record};

/// Comparison operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::GreaterThan => write!(f, ">"),
            QueryOperator::GreaterThanOrEqual => write!(f, ">="),
            QueryOperator::LessThan => write!(f, "<"),
            QueryOperator::LessThanOrEqual => write!(f, "<="),
        }
    }
}

impl QueryOperator {
    /// Operator tokens, longest first so that ">=" wins over ">"
    pub(crate) const TOKENS: [(&'static str, QueryOperator); 7] = [
        (">=", QueryOperator::GreaterThanOrEqual),
        ("<=", QueryOperator::LessThanOrEqual),
        ("!=", QueryOperator::NotEqual),
        ("==", QueryOperator::Equal),
        ("=", QueryOperator::Equal),
        (">", QueryOperator::GreaterThan),
        ("<", QueryOperator::LessThan),
    ];

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            QueryOperator::Equal => ordering == Ordering::Equal,
            QueryOperator::NotEqual => ordering != Ordering::Equal,
            QueryOperator::GreaterThan => ordering == Ordering::Greater,
            QueryOperator::GreaterThanOrEqual => ordering != Ordering::Less,
            QueryOperator::LessThan => ordering == Ordering::Less,
            QueryOperator::LessThanOrEqual => ordering != Ordering::Greater,
        }
    }
}

/// A filter evaluated by the data source, never after materialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    Compare {
        attribute: String,
        operator: QueryOperator,
        value: Value,
    },
    /// Membership of an integer attribute in a key set
    In {
        attribute: String,
        keys: BTreeSet<Key>,
    },
    /// Matches the record's own key
    Key(Key),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(attribute: &str, operator: QueryOperator, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            attribute: attribute.to_string(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(attribute: &str, value: impl Into<Value>) -> Self {
        Self::compare(attribute, QueryOperator::Equal, value)
    }

    pub fn ne(attribute: &str, value: impl Into<Value>) -> Self {
        Self::compare(attribute, QueryOperator::NotEqual, value)
    }

    pub fn gt(attribute: &str, value: impl Into<Value>) -> Self {
        Self::compare(attribute, QueryOperator::GreaterThan, value)
    }

    pub fn gte(attribute: &str, value: impl Into<Value>) -> Self {
        Self::compare(attribute, QueryOperator::GreaterThanOrEqual, value)
    }

    pub fn lt(attribute: &str, value: impl Into<Value>) -> Self {
        Self::compare(attribute, QueryOperator::LessThan, value)
    }

    pub fn lte(attribute: &str, value: impl Into<Value>) -> Self {
        Self::compare(attribute, QueryOperator::LessThanOrEqual, value)
    }

    pub fn in_keys(attribute: &str, keys: impl IntoIterator<Item = Key>) -> Self {
        Predicate::In {
            attribute: attribute.to_string(),
            keys: keys.into_iter().collect(),
        }
    }

    /// Conjunction, flattening nested `And`s
    pub fn and(self, other: Predicate) -> Self {
        let mut parts = match self {
            Predicate::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Predicate::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Predicate::And(parts)
    }

    /// Conjunction of an optional predicate with another
    pub fn combine(existing: Option<Predicate>, other: Predicate) -> Predicate {
        match existing {
            Some(p) => p.and(other),
            None => other,
        }
    }

    /// Evaluate against a record. A missing attribute never matches.
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Compare {
                attribute,
                operator,
                value,
            } => match record.get(attribute) {
                Some(actual) => compare_values(actual, value)
                    .map(|ordering| operator.accepts(ordering))
                    .unwrap_or(*operator == QueryOperator::NotEqual && actual != value),
                None => false,
            },
            Predicate::In { attribute, keys } => record
                .key_of(attribute)
                .map(|k| keys.contains(&k))
                .unwrap_or(false),
            Predicate::Key(key) => record.key == *key,
            Predicate::And(parts) => parts.iter().all(|p| p.matches(record)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare {
                attribute,
                operator,
                value,
            } => match value {
                Value::String(s) if s.contains('\'') => write!(f, "{} {} \"{}\"", attribute, operator, s),
                Value::String(s) => write!(f, "{} {} '{}'", attribute, operator, s),
                other => write!(f, "{} {} {}", attribute, operator, other),
            },
            Predicate::In { attribute, keys } => {
                let keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
                write!(f, "{} IN ({})", attribute, keys.join(", "))
            }
            Predicate::Key(key) => write!(f, "key = {}", key),
            Predicate::And(parts) => {
                let parts: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
                write!(f, "{}", parts.join(" && "))
            }
        }
    }
}

/// Order two JSON values: numbers numerically, timestamps chronologically,
/// other strings lexicographically. `None` when the values are incomparable.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => match (parse_timestamp(a), parse_timestamp(b)) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => Some(a.cmp(b)),
        },
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
