//! Core Data Source Traits
//!
//! This module defines the capability the loader needs from a backing store.
//! Every read operation is exactly one round trip; implementations must not
//! split a call into several requests, so round-trip accounting stays exact.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::SourceResult;
use crate::query::Predicate;
use crate::record::{Key, Record};
use crate::relationships::JoinSpec;

/// Read capability over a backing store
#[async_trait]
pub trait DataSource: Send + Sync {
    /// All records of an entity matching the optional predicate
    async fn scan_all(&self, entity: &str, predicate: Option<&Predicate>) -> SourceResult<Vec<Record>>;

    /// Records whose foreign key attribute is in `parent_keys` ("IN" filter),
    /// further restricted by the optional predicate
    async fn scan_by_foreign_key(
        &self,
        entity: &str,
        fk_attribute: &str,
        parent_keys: &BTreeSet<Key>,
        predicate: Option<&Predicate>,
    ) -> SourceResult<Vec<Record>>;

    /// Records of `target` linked through a join table to any of `owner_keys`,
    /// each paired with the owner key it was reached from
    async fn scan_by_join(
        &self,
        target: &str,
        join: &JoinSpec,
        owner_keys: &BTreeSet<Key>,
        predicate: Option<&Predicate>,
    ) -> SourceResult<Vec<(Key, Record)>>;

    /// A single record by key
    async fn lookup_by_key(&self, entity: &str, key: Key) -> SourceResult<Option<Record>>;
}

/// Bulk write capability used by seeding collaborators. Writes are not loader
/// round trips.
#[async_trait]
pub trait DataSink: Send + Sync {
    /// Insert one record, checking foreign keys
    async fn insert(&self, record: Record) -> SourceResult<()>;

    /// Insert records in order, checking foreign keys
    async fn insert_many(&self, records: Vec<Record>) -> SourceResult<usize> {
        let count = records.len();
        for record in records {
            self.insert(record).await?;
        }
        Ok(count)
    }

    /// Associate two keys through a join table
    async fn link(&self, join_table: &str, owner: Key, related: Key) -> SourceResult<()>;

    /// Whether an entity has no records yet
    async fn is_empty(&self, entity: &str) -> SourceResult<bool>;
}

/// The adapter operation a round trip used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RoundTripKind {
    ScanAll,
    ScanByForeignKey,
    ScanByJoin,
    LookupByKey,
}

impl fmt::Display for RoundTripKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundTripKind::ScanAll => write!(f, "scan_all"),
            RoundTripKind::ScanByForeignKey => write!(f, "scan_by_foreign_key"),
            RoundTripKind::ScanByJoin => write!(f, "scan_by_join"),
            RoundTripKind::LookupByKey => write!(f, "lookup_by_key"),
        }
    }
}

/// One logged round trip
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundTrip {
    /// 1-based position within the invocation
    pub seq: usize,
    pub kind: RoundTripKind,
    pub entity: String,
    /// Number of keys in the membership filter (1 for lookups, 0 for scans)
    pub key_count: usize,
    /// Rows returned; 0 when the trip failed
    pub rows: usize,
    /// Rendered pushed-down predicate, if any
    pub filter: Option<String>,
}

impl fmt::Display for RoundTrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} keys={} rows={}",
            self.seq, self.kind, self.entity, self.key_count, self.rows
        )?;
        if let Some(filter) = &self.filter {
            write!(f, " where {}", filter)?;
        }
        Ok(())
    }
}
