//! In-memory backend
//!
//! A reference data source: one ordered table per entity, one pair set per
//! join table, referential integrity checked on insert. Reads can be slowed
//! down and bounded by a timeout to imitate a remote database.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::RwLock;

use super::core::{DataSink, DataSource};
use crate::config::SourceConfig;
use crate::error::{SourceError, SourceResult};
use crate::query::Predicate;
use crate::record::{Key, Record};
use crate::relationships::{Cardinality, JoinSpec, RelationshipLink, SchemaModel};

#[derive(Debug, Default)]
struct JoinTable {
    /// Column order the pairs are stored in
    columns: (String, String),
    pairs: BTreeSet<(Key, Key)>,
}

#[derive(Debug, Default)]
struct Tables {
    entities: HashMap<String, BTreeMap<Key, Record>>,
    joins: HashMap<String, JoinTable>,
}

/// In-memory data source and sink
pub struct InMemoryStore {
    schema: Arc<SchemaModel>,
    tables: RwLock<Tables>,
    config: SourceConfig,
    reads: AtomicUsize,
    failures: Mutex<HashMap<String, SourceError>>,
}

impl InMemoryStore {
    /// Create an empty store with tables for every entity and join table
    pub fn new(schema: Arc<SchemaModel>) -> Self {
        Self::with_config(schema, SourceConfig::default())
    }

    pub fn with_config(schema: Arc<SchemaModel>, config: SourceConfig) -> Self {
        let mut tables = Tables::default();
        for name in schema.entity_names() {
            tables.entities.insert(name.to_string(), BTreeMap::new());
        }
        for join in schema.join_tables() {
            tables.joins.insert(
                join.table.clone(),
                JoinTable {
                    columns: (join.owner_column.clone(), join.related_column.clone()),
                    pairs: BTreeSet::new(),
                },
            );
        }

        Self {
            schema,
            tables: RwLock::new(tables),
            config,
            reads: AtomicUsize::new(0),
            failures: Mutex::new(HashMap::new()),
        }
    }

    pub fn schema(&self) -> &Arc<SchemaModel> {
        &self.schema
    }

    /// Read requests served over the store's lifetime, across all invocations
    pub fn total_round_trips(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every read touching `entity` fail with `error`
    pub fn fail_reads_of(&self, entity: &str, error: SourceError) {
        self.failures.lock().insert(entity.to_string(), error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    pub async fn count(&self, entity: &str) -> SourceResult<usize> {
        let tables = self.tables.read().await;
        Ok(table(&tables, entity)?.len())
    }

    /// Serve one read: count it, apply injected failures, latency and timeout
    async fn serve<T, F>(&self, entity: &str, read: F) -> SourceResult<T>
    where
        F: Future<Output = SourceResult<T>> + Send,
        T: Send,
    {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let injected = self.failures.lock().get(entity).cloned();
        if let Some(error) = injected {
            return Err(error);
        }

        let latency = self.config.latency;
        let delayed = async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            read.await
        };

        match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, delayed)
                .await
                .map_err(|_| SourceError::Timeout(limit))?,
            None => delayed.await,
        }
    }

    fn check_references(&self, tables: &Tables, record: &Record) -> SourceResult<()> {
        for entity in self.schema.entity_names() {
            let Ok(relationships) = self.schema.relationships_of(entity) else {
                continue;
            };
            for rel in relationships {
                let RelationshipLink::ForeignKey { attribute } = &rel.link else {
                    continue;
                };
                if rel.dependent() != record.entity {
                    continue;
                }
                let referenced = match rel.cardinality {
                    Cardinality::Many => &rel.source,
                    Cardinality::One => &rel.target,
                };
                let fk = record.key_of(attribute).ok_or_else(|| {
                    SourceError::Constraint(format!(
                        "{} {} is missing required foreign key '{}'",
                        record.entity, record.key, attribute
                    ))
                })?;
                if !table(tables, referenced)?.contains_key(&fk) {
                    return Err(SourceError::Constraint(format!(
                        "{} {} references missing {} {} via '{}'",
                        record.entity, record.key, referenced, fk, attribute
                    )));
                }
            }
        }
        Ok(())
    }
}

fn table<'a>(tables: &'a Tables, entity: &str) -> SourceResult<&'a BTreeMap<Key, Record>> {
    tables
        .entities
        .get(entity)
        .ok_or_else(|| SourceError::UnknownEntity(entity.to_string()))
}

fn filtered<'a>(
    records: impl Iterator<Item = &'a Record>,
    predicate: Option<&Predicate>,
) -> Vec<Record> {
    records
        .filter(|r| predicate.map_or(true, |p| p.matches(r)))
        .cloned()
        .collect()
}

#[async_trait]
impl DataSource for InMemoryStore {
    async fn scan_all(&self, entity: &str, predicate: Option<&Predicate>) -> SourceResult<Vec<Record>> {
        self.serve(entity, async {
            let tables = self.tables.read().await;
            Ok(filtered(table(&tables, entity)?.values(), predicate))
        })
        .await
    }

    async fn scan_by_foreign_key(
        &self,
        entity: &str,
        fk_attribute: &str,
        parent_keys: &BTreeSet<Key>,
        predicate: Option<&Predicate>,
    ) -> SourceResult<Vec<Record>> {
        self.serve(entity, async {
            let tables = self.tables.read().await;
            let rows = table(&tables, entity)?.values().filter(|r| {
                r.key_of(fk_attribute)
                    .map_or(false, |fk| parent_keys.contains(&fk))
            });
            Ok(filtered(rows, predicate))
        })
        .await
    }

    async fn scan_by_join(
        &self,
        target: &str,
        join: &JoinSpec,
        owner_keys: &BTreeSet<Key>,
        predicate: Option<&Predicate>,
    ) -> SourceResult<Vec<(Key, Record)>> {
        self.serve(target, async {
            let tables = self.tables.read().await;
            let link = tables
                .joins
                .get(&join.table)
                .ok_or_else(|| SourceError::UnknownEntity(join.table.clone()))?;
            let targets = table(&tables, target)?;

            let owner_first = link.columns.0 == join.owner_column;
            let mut pairs: Vec<(Key, Key)> = link
                .pairs
                .iter()
                .map(|&(a, b)| if owner_first { (a, b) } else { (b, a) })
                .filter(|(owner, _)| owner_keys.contains(owner))
                .collect();
            pairs.sort_unstable();

            Ok(pairs
                .into_iter()
                .filter_map(|(owner, related)| targets.get(&related).map(|r| (owner, r)))
                .filter(|(_, r)| predicate.map_or(true, |p| p.matches(r)))
                .map(|(owner, r)| (owner, r.clone()))
                .collect())
        })
        .await
    }

    async fn lookup_by_key(&self, entity: &str, key: Key) -> SourceResult<Option<Record>> {
        self.serve(entity, async {
            let tables = self.tables.read().await;
            Ok(table(&tables, entity)?.get(&key).cloned())
        })
        .await
    }
}

#[async_trait]
impl DataSink for InMemoryStore {
    async fn insert(&self, mut record: Record) -> SourceResult<()> {
        let key_attribute = self
            .schema
            .key_attribute(&record.entity)
            .ok_or_else(|| SourceError::UnknownEntity(record.entity.clone()))?
            .to_string();

        match record.key_of(&key_attribute) {
            Some(k) if k != record.key => {
                return Err(SourceError::Constraint(format!(
                    "{} key {} disagrees with attribute {} = {}",
                    record.entity, record.key, key_attribute, k
                )));
            }
            Some(_) => {}
            None => {
                record.fields.insert(key_attribute, record.key.into());
            }
        }

        let mut tables = self.tables.write().await;
        self.check_references(&tables, &record)?;

        let rows = tables
            .entities
            .get_mut(&record.entity)
            .ok_or_else(|| SourceError::UnknownEntity(record.entity.clone()))?;
        if rows.contains_key(&record.key) {
            return Err(SourceError::Constraint(format!(
                "duplicate key {} in {}",
                record.key, record.entity
            )));
        }
        rows.insert(record.key, record);
        Ok(())
    }

    async fn link(&self, join_table: &str, owner: Key, related: Key) -> SourceResult<()> {
        let join = self
            .schema
            .join_tables()
            .into_iter()
            .find(|j| j.table == join_table)
            .cloned()
            .ok_or_else(|| SourceError::UnknownEntity(join_table.to_string()))?;

        // Entities on each side of the join, as declared by the first relationship using it
        let (owner_entity, related_entity) = self
            .schema
            .entity_names()
            .flat_map(|e| self.schema.relationships_of(e).unwrap_or_default())
            .find(|r| matches!(&r.link, RelationshipLink::Join(j) if *j == join))
            .map(|r| (r.source.clone(), r.target.clone()))
            .ok_or_else(|| SourceError::UnknownEntity(join_table.to_string()))?;

        let mut tables = self.tables.write().await;
        if !table(&tables, &owner_entity)?.contains_key(&owner) {
            return Err(SourceError::Constraint(format!(
                "{} link references missing {} {}",
                join_table, owner_entity, owner
            )));
        }
        if !table(&tables, &related_entity)?.contains_key(&related) {
            return Err(SourceError::Constraint(format!(
                "{} link references missing {} {}",
                join_table, related_entity, related
            )));
        }

        let link = tables
            .joins
            .get_mut(join_table)
            .ok_or_else(|| SourceError::UnknownEntity(join_table.to_string()))?;
        if !link.pairs.insert((owner, related)) {
            return Err(SourceError::Constraint(format!(
                "duplicate {} pair ({}, {})",
                join_table, owner, related
            )));
        }
        Ok(())
    }

    async fn is_empty(&self, entity: &str) -> SourceResult<bool> {
        let tables = self.tables.read().await;
        Ok(table(&tables, entity)?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relationships::blog_schema;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new(Arc::new(blog_schema().unwrap()));
        store
            .insert_many(vec![
                Record::new("Blog", 1).with("Title", "Tech Blog"),
                Record::new("Blog", 2).with("Title", "Cooking Blog"),
                Record::new("Post", 1).with("BlogId", 1).with("Title", "EF Core Basics"),
                Record::new("Post", 2).with("BlogId", 1).with("Title", "Advanced EF Core"),
                Record::new("Post", 3).with("BlogId", 2).with("Title", "Pasta Recipe"),
                Record::new("Tag", 1).with("Name", "Programming"),
                Record::new("Tag", 2).with("Name", "Food"),
            ])
            .await
            .unwrap();
        store.link("BlogTags", 1, 1).await.unwrap();
        store.link("BlogTags", 2, 2).await.unwrap();
        store.link("BlogTags", 2, 1).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_fills_key_attribute() {
        let store = seeded().await;
        let blog = store.lookup_by_key("Blog", 1).await.unwrap().unwrap();
        assert_eq!(blog.key_of("Id"), Some(1));
        assert!(store.lookup_by_key("Blog", 99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_by_foreign_key_filters_membership_and_predicate() {
        let store = seeded().await;
        let keys: BTreeSet<Key> = [1].into_iter().collect();
        let posts = store.scan_by_foreign_key("Post", "BlogId", &keys, None).await.unwrap();
        assert_eq!(posts.iter().map(|p| p.key).collect::<Vec<_>>(), vec![1, 2]);

        let advanced = Predicate::eq("Title", "Advanced EF Core");
        let posts = store
            .scan_by_foreign_key("Post", "BlogId", &keys, Some(&advanced))
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].key, 2);
    }

    #[tokio::test]
    async fn test_scan_by_join_both_directions() {
        let store = seeded().await;
        let schema = blog_schema().unwrap();
        let blog_tags = match &schema.relationship("Blog", "Tags").unwrap().link {
            RelationshipLink::Join(j) => j.clone(),
            _ => unreachable!(),
        };

        let owners: BTreeSet<Key> = [1, 2].into_iter().collect();
        let tags = store.scan_by_join("Tag", &blog_tags, &owners, None).await.unwrap();
        let pairs: Vec<(Key, Key)> = tags.iter().map(|(o, r)| (*o, r.key)).collect();
        assert_eq!(pairs, vec![(1, 1), (2, 1), (2, 2)]);

        let tag_keys: BTreeSet<Key> = [1].into_iter().collect();
        let blogs = store
            .scan_by_join("Blog", &blog_tags.inverse(), &tag_keys, None)
            .await
            .unwrap();
        let pairs: Vec<(Key, Key)> = blogs.iter().map(|(o, r)| (*o, r.key)).collect();
        assert_eq!(pairs, vec![(1, 1), (1, 2)]);
    }

    #[tokio::test]
    async fn test_referential_integrity() {
        let store = seeded().await;

        let orphan = store.insert(Record::new("Post", 10).with("BlogId", 42)).await;
        assert!(matches!(orphan, Err(SourceError::Constraint(_))));

        let missing_fk = store.insert(Record::new("Comment", 1).with("Author", "John")).await;
        assert!(matches!(missing_fk, Err(SourceError::Constraint(_))));

        let duplicate = store.insert(Record::new("Blog", 1)).await;
        assert!(matches!(duplicate, Err(SourceError::Constraint(_))));

        let duplicate_pair = store.link("BlogTags", 1, 1).await;
        assert!(matches!(duplicate_pair, Err(SourceError::Constraint(_))));

        let dangling_pair = store.link("BlogTags", 1, 77).await;
        assert!(matches!(dangling_pair, Err(SourceError::Constraint(_))));

        let unknown = store.insert(Record::new("Author", 1)).await;
        assert_eq!(unknown, Err(SourceError::UnknownEntity("Author".to_string())));
    }

    #[tokio::test]
    async fn test_reads_are_counted_writes_are_not() {
        let store = seeded().await;
        assert_eq!(store.total_round_trips(), 0);
        store.scan_all("Blog", None).await.unwrap();
        store.lookup_by_key("Post", 1).await.unwrap();
        assert_eq!(store.total_round_trips(), 2);
        assert!(!store.is_empty("Blog").await.unwrap());
        assert!(store.is_empty("Comment").await.unwrap());
        assert_eq!(store.count("Post").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_injected_failure_and_timeout() {
        let store = seeded().await;
        store.fail_reads_of("Post", SourceError::Connection("refused".to_string()));
        assert_eq!(
            store.scan_all("Post", None).await,
            Err(SourceError::Connection("refused".to_string()))
        );
        store.clear_failures();
        assert!(store.scan_all("Post", None).await.is_ok());

        let slow = InMemoryStore::with_config(
            Arc::new(blog_schema().unwrap()),
            SourceConfig {
                latency: Duration::from_millis(200),
                timeout: Some(Duration::from_millis(10)),
            },
        );
        assert_eq!(
            slow.scan_all("Blog", None).await,
            Err(SourceError::Timeout(Duration::from_millis(10)))
        );
    }
}
