//! Level-at-a-time relationship loading
//!
//! Every include level costs one round trip scoped to the keys of the whole
//! previous level, however many parents there are. Results are partitioned
//! in memory and attached only after the level and everything below it has
//! loaded, so a failure leaves the parents untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;

use super::batch_loader::{attach, group_by_key};
use super::include_tree::IncludeNode;
use crate::backends::{CountingSource, TripContext};
use crate::error::{LoadError, LoaderResult, SchemaError, SourceError};
use crate::query::Predicate;
use crate::record::{Key, Record};
use crate::relationships::{Cardinality, Node, RelationshipLink, SchemaModel};

/// How a level's rows are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelFetch {
    /// Membership scan on the dependent's key attribute
    KeySet,
    /// `scan_all` with an `IN` predicate, grouped afterwards
    FilteredScan,
    /// Scoped to a single parent; belongs-to uses a key lookup
    Entry,
}

type LevelFuture<'a> = Pin<Box<dyn Future<Output = LoaderResult<()>> + Send + 'a>>;

/// Loads include levels through one invocation's counting source
pub struct EagerLoader<'a> {
    schema: &'a SchemaModel,
    source: &'a CountingSource,
}

impl<'a> EagerLoader<'a> {
    pub fn new(schema: &'a SchemaModel, source: &'a CountingSource) -> Self {
        Self { schema, source }
    }

    /// Load `include` and its nested levels for every parent
    pub fn load_level<'b>(&'b self, parents: &'b mut [Node], include: &'b IncludeNode, fetch: LevelFetch) -> LevelFuture<'b>
    where
        'a: 'b,
    {
        Box::pin(async move {
            let relationship = &include.relationship;
            tracing::debug!(path = %include.path, parents = parents.len(), "Loading relationship level");

            let fetched = self.fetch(parents, include, fetch).await?;
            if relationship.cardinality == Cardinality::One && include.filter.is_none() {
                self.check_targets(parents, include, &fetched)?;
            }

            let (owners, mut children): (Vec<Key>, Vec<Node>) = fetched
                .into_iter()
                .map(|(owner, record)| (owner, Node::unresolved(record, self.schema)))
                .unzip();

            // Below an entry-scoped level the whole fetched set is loaded at once
            let nested = match fetch {
                LevelFetch::Entry => LevelFetch::KeySet,
                other => other,
            };
            for child in &include.children {
                self.load_level(&mut children, child, nested).await?;
            }

            let groups: BTreeMap<Key, Vec<Node>> = group_by_key(owners.into_iter().zip(children), |(owner, _)| Some(*owner))
                .into_iter()
                .map(|(owner, pairs)| (owner, pairs.into_iter().map(|(_, node)| node).collect()))
                .collect();

            match (&relationship.link, relationship.cardinality) {
                (RelationshipLink::ForeignKey { attribute }, Cardinality::One) => {
                    attach(parents, &relationship.name, &groups, |p| p.record.key_of(attribute))
                }
                _ => attach(parents, &relationship.name, &groups, |p| Some(p.key())),
            }
            Ok(())
        })
    }

    /// One round trip for the level; each record comes back with the key of
    /// the parent side it belongs to (the target's own key for belongs-to)
    async fn fetch(&self, parents: &[Node], include: &IncludeNode, fetch: LevelFetch) -> LoaderResult<Vec<(Key, Record)>> {
        let relationship = &include.relationship;
        let filter = include.filter.as_ref();

        let keys: BTreeSet<Key> = match (&relationship.link, relationship.cardinality) {
            (RelationshipLink::ForeignKey { attribute }, Cardinality::One) => {
                parents.iter().filter_map(|p| p.record.key_of(attribute)).collect()
            }
            _ => parents.iter().map(Node::key).collect(),
        };
        if keys.is_empty() {
            tracing::debug!(path = %include.path, "No keys at this level, skipping round trip");
            return Ok(Vec::new());
        }

        let ctx = match (fetch, parents) {
            (LevelFetch::Entry, [parent]) => TripContext::entry(&include.path, parent.key()),
            _ => TripContext::path(&include.path),
        };
        let target = relationship.target.as_str();

        match (&relationship.link, relationship.cardinality) {
            (RelationshipLink::Join(join), _) => self.source.scan_by_join(ctx, target, join, &keys, filter).await,

            (RelationshipLink::ForeignKey { attribute }, Cardinality::Many) => {
                let records = match fetch {
                    LevelFetch::FilteredScan => {
                        let predicate = membership(attribute, &keys, filter);
                        self.source.scan_all(ctx, target, Some(&predicate)).await?
                    }
                    _ => {
                        self.source
                            .scan_by_foreign_key(ctx, target, attribute, &keys, filter)
                            .await?
                    }
                };
                Ok(records
                    .into_iter()
                    .filter_map(|r| r.key_of(attribute).map(|owner| (owner, r)))
                    .collect())
            }

            (RelationshipLink::ForeignKey { .. }, Cardinality::One) => {
                let key_attribute = self
                    .schema
                    .key_attribute(target)
                    .ok_or_else(|| SchemaError::UnknownEntity(target.to_string()))?;

                let records = match (fetch, keys.iter().next()) {
                    (LevelFetch::Entry, Some(&key)) if keys.len() == 1 => self
                        .source
                        .lookup_by_key(ctx, target, key)
                        .await?
                        .filter(|r| filter.map_or(true, |p| p.matches(r)))
                        .into_iter()
                        .collect(),
                    (LevelFetch::FilteredScan, _) => {
                        let predicate = membership(key_attribute, &keys, filter);
                        self.source.scan_all(ctx, target, Some(&predicate)).await?
                    }
                    _ => {
                        self.source
                            .scan_by_foreign_key(ctx, target, key_attribute, &keys, filter)
                            .await?
                    }
                };
                Ok(records.into_iter().map(|r| (r.key, r)).collect())
            }
        }
    }

    /// A belongs-to target must exist unless a filter excluded it
    fn check_targets(&self, parents: &[Node], include: &IncludeNode, fetched: &[(Key, Record)]) -> LoaderResult<()> {
        let Some(attribute) = include.relationship.foreign_key() else {
            return Ok(());
        };
        let found: BTreeSet<Key> = fetched.iter().map(|(key, _)| *key).collect();

        for parent in parents {
            if let Some(target_key) = parent.record.key_of(attribute) {
                if !found.contains(&target_key) {
                    tracing::warn!(
                        path = %include.path,
                        key = parent.key(),
                        "{} {} references missing {} {}",
                        parent.entity(),
                        parent.key(),
                        include.relationship.target,
                        target_key
                    );
                    return Err(LoadError::new(
                        include.path.clone(),
                        Some(parent.key()),
                        SourceError::NotFound {
                            entity: include.relationship.target.clone(),
                            key: target_key,
                        },
                    )
                    .into());
                }
            }
        }
        Ok(())
    }
}

/// `attribute IN (keys)`, conjoined with the level's filter
fn membership(attribute: &str, keys: &BTreeSet<Key>, filter: Option<&Predicate>) -> Predicate {
    let predicate = Predicate::in_keys(attribute, keys.iter().copied());
    match filter {
        Some(filter) => predicate.and(filter.clone()),
        None => predicate,
    }
}
