//! Load sessions - the per-invocation context that outlives `Loader::load`
//!
//! Lazy resolution and explicit loading keep counting against the invocation
//! that produced the nodes, so the outcome carries its session along.

use std::sync::Arc;

use super::eager_loader::{EagerLoader, LevelFetch};
use super::include_tree::{IncludeNode, IncludeTree};
use super::{LoadPhase, LoadStrategy};
use crate::backends::{CountingSource, RoundTrip, TripContext};
use crate::config::EngineConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::query::{RelationshipPath, RootQuery, RootSelection};
use crate::relationships::{Node, SchemaModel};

/// Schema and counting source of one invocation
#[derive(Clone)]
pub struct LoadSession {
    schema: Arc<SchemaModel>,
    source: CountingSource,
    config: EngineConfig,
}

impl LoadSession {
    pub(crate) fn new(schema: Arc<SchemaModel>, source: CountingSource, config: EngineConfig) -> Self {
        Self { schema, source, config }
    }

    pub fn schema(&self) -> &SchemaModel {
        &self.schema
    }

    /// Round trips issued by this invocation so far
    pub fn round_trips(&self) -> usize {
        self.source.round_trips()
    }

    pub fn log(&self) -> Vec<RoundTrip> {
        self.source.log()
    }

    pub(crate) fn eager(&self) -> EagerLoader<'_> {
        EagerLoader::new(&self.schema, &self.source)
    }

    pub(crate) async fn fetch_roots(&self, root: &RootQuery) -> LoaderResult<Vec<Node>> {
        let ctx = TripContext::root();
        let records = match &root.selection {
            RootSelection::Scan(predicate) => self.source.scan_all(ctx, &root.entity, predicate.as_ref()).await?,
            RootSelection::Key(key) => self
                .source
                .lookup_by_key(ctx, &root.entity, *key)
                .await?
                .into_iter()
                .collect(),
        };
        Ok(records
            .into_iter()
            .map(|record| Node::unresolved(record, &self.schema))
            .collect())
    }

    /// Resolve a relationship of one node on first access
    ///
    /// An unresolved relationship costs one round trip scoped to this node; a
    /// loaded one costs nothing. The returned nodes are themselves lazy.
    pub async fn related<'n>(&self, node: &'n mut Node, name: &str) -> LoaderResult<&'n [Node]> {
        let descriptor = self
            .schema
            .relationship(node.entity(), name)
            .ok_or_else(|| LoaderError::UnknownRelationship {
                entity: node.entity().to_string(),
                relationship: name.to_string(),
            })?;

        if !node.is_loaded(name) {
            let include = IncludeNode::leaf(descriptor.clone(), None);
            self.eager()
                .load_level(std::slice::from_mut(node), &include, LevelFetch::Entry)
                .await?;
        }

        node.loaded(name)
            .ok_or_else(|| LoaderError::UnknownRelationship {
                entity: node.entity().to_string(),
                relationship: name.to_string(),
            })
    }

    /// Load a path for a whole node set: one round trip per level
    pub async fn load_collection(&self, nodes: &mut [Node], path: &RelationshipPath) -> LoaderResult<()> {
        let Some(tree) = self.tree_for(nodes, path)? else {
            return Ok(());
        };
        for include in &tree.children {
            self.eager().load_level(nodes, include, LevelFetch::KeySet).await?;
        }
        tracing::debug!(path = %path, nodes = nodes.len(), "Explicitly loaded collection");
        Ok(())
    }

    /// Load a path for one node: the first level is scoped to the node,
    /// deeper levels load across what that level returned
    pub async fn load_entry(&self, node: &mut Node, path: &RelationshipPath) -> LoaderResult<()> {
        let nodes = std::slice::from_mut(node);
        let Some(tree) = self.tree_for(nodes, path)? else {
            return Ok(());
        };
        for include in &tree.children {
            self.eager().load_level(nodes, include, LevelFetch::Entry).await?;
        }
        Ok(())
    }

    fn tree_for(&self, nodes: &[Node], path: &RelationshipPath) -> LoaderResult<Option<IncludeTree>> {
        let Some(first) = nodes.first() else {
            return Ok(None);
        };
        let entity = first.entity();
        if let Some(other) = nodes.iter().find(|n| n.entity() != entity) {
            return Err(LoaderError::InvalidPath(format!(
                "'{}' cannot be loaded for a mix of {} and {} nodes",
                path,
                entity,
                other.entity()
            )));
        }
        IncludeTree::build(&self.schema, entity, std::slice::from_ref(path), self.config.max_depth).map(Some)
    }
}

/// The materialized root set of one invocation plus its telemetry
pub struct LoadOutcome {
    pub roots: Vec<Node>,
    pub strategy: LoadStrategy,
    pub session: LoadSession,
    pub(crate) phases: Vec<LoadPhase>,
}

impl LoadOutcome {
    pub fn round_trips(&self) -> usize {
        self.session.round_trips()
    }

    pub fn log(&self) -> Vec<RoundTrip> {
        self.session.log()
    }

    /// State transitions this invocation went through
    pub fn phases(&self) -> &[LoadPhase] {
        &self.phases
    }

    /// See [`LoadSession::related`]
    pub async fn related<'n>(&self, node: &'n mut Node, name: &str) -> LoaderResult<&'n [Node]> {
        self.session.related(node, name).await
    }

    /// See [`LoadSession::load_collection`]
    pub async fn load_collection(&self, nodes: &mut [Node], path: &RelationshipPath) -> LoaderResult<()> {
        self.session.load_collection(nodes, path).await
    }

    /// See [`LoadSession::load_entry`]
    pub async fn load_entry(&self, node: &mut Node, path: &RelationshipPath) -> LoaderResult<()> {
        self.session.load_entry(node, path).await
    }

    /// Split into the roots and a session that keeps counting
    pub fn into_parts(self) -> (Vec<Node>, LoadSession) {
        (self.roots, self.session)
    }
}

impl std::fmt::Debug for LoadOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadOutcome")
            .field("roots", &self.roots.len())
            .field("strategy", &self.strategy)
            .field("round_trips", &self.round_trips())
            .finish()
    }
}
