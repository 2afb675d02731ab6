//! Loading strategy engine
//!
//! One operation, [`Loader::load`], parameterized by [`LoadStrategy`]. Paths
//! are validated before the first round trip; round trips are issued in
//! declaration order; a failure discards the partial graph.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::backends::{CountingSource, DataSource};
use crate::config::EngineConfig;
use crate::error::{LoaderError, LoaderResult};
use crate::query::{RelationshipPath, RootQuery};
use crate::relationships::SchemaModel;

pub mod batch_loader;
pub mod eager_loader;
pub mod include_tree;
pub mod session;

pub use batch_loader::{attach, group_by_attribute, group_by_key};
pub use eager_loader::{EagerLoader, LevelFetch};
pub use include_tree::{IncludeNode, IncludeTree};
pub use session::{LoadOutcome, LoadSession};

/// When related collections are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadStrategy {
    /// On first access, one round trip per node and relationship
    Lazy,
    /// Up front, one round trip per include level
    Eager,
    /// Only when the caller asks, per node or per node set
    Explicit,
    /// Up front, as filtered scans grouped in memory
    Batch,
}

impl fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStrategy::Lazy => "lazy",
            LoadStrategy::Eager => "eager",
            LoadStrategy::Explicit => "explicit",
            LoadStrategy::Batch => "batch",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for LoadStrategy {
    type Err = LoaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lazy" => Ok(LoadStrategy::Lazy),
            "eager" => Ok(LoadStrategy::Eager),
            "explicit" => Ok(LoadStrategy::Explicit),
            "batch" => Ok(LoadStrategy::Batch),
            _ => Err(LoaderError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Invocation state: `Idle → RootLoaded → PathLoading* → Assembled`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    RootLoaded { roots: usize },
    PathLoading { path: String },
    Assembled,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::Idle => write!(f, "idle"),
            LoadPhase::RootLoaded { roots } => write!(f, "root loaded ({} nodes)", roots),
            LoadPhase::PathLoading { path } => write!(f, "loading {}", path),
            LoadPhase::Assembled => write!(f, "assembled"),
        }
    }
}

/// Fetches root entities and their relationships from a data source
#[derive(Clone)]
pub struct Loader {
    schema: Arc<SchemaModel>,
    source: Arc<dyn DataSource>,
    config: EngineConfig,
    cancel: CancellationToken,
}

impl Loader {
    pub fn new(schema: Arc<SchemaModel>, source: Arc<dyn DataSource>) -> Self {
        Self::with_config(schema, source, EngineConfig::default())
    }

    pub fn with_config(schema: Arc<SchemaModel>, source: Arc<dyn DataSource>, config: EngineConfig) -> Self {
        Self {
            schema,
            source,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a caller-owned token; cancelling it stops loads before their next round trip
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn schema(&self) -> &Arc<SchemaModel> {
        &self.schema
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// A fresh per-invocation session with its own round-trip counter
    pub fn session(&self) -> LoadSession {
        let source = CountingSource::new(self.source.clone(), self.cancel.clone());
        LoadSession::new(self.schema.clone(), source, self.config.clone())
    }

    /// Load the root set and, depending on the strategy, the declared paths
    pub async fn load(
        &self,
        root: RootQuery,
        strategy: LoadStrategy,
        paths: &[RelationshipPath],
    ) -> LoaderResult<LoadOutcome> {
        let tree = IncludeTree::build(&self.schema, &root.entity, paths, self.config.max_depth)?;
        let session = self.session();

        let mut phases = Vec::new();
        let mut enter = |phase: LoadPhase| {
            tracing::debug!(entity = %root.entity, strategy = %strategy, "Load phase: {}", phase);
            phases.push(phase);
        };
        enter(LoadPhase::Idle);

        let mut roots = session.fetch_roots(&root).await?;
        enter(LoadPhase::RootLoaded { roots: roots.len() });

        let fetch = match strategy {
            LoadStrategy::Eager => Some(LevelFetch::KeySet),
            LoadStrategy::Batch => Some(LevelFetch::FilteredScan),
            LoadStrategy::Lazy | LoadStrategy::Explicit => None,
        };
        if let Some(fetch) = fetch {
            for include in &tree.children {
                enter(LoadPhase::PathLoading {
                    path: include.path.clone(),
                });
                session.eager().load_level(&mut roots, include, fetch).await?;
            }
        }
        enter(LoadPhase::Assembled);

        tracing::info!(
            entity = %root.entity,
            strategy = %strategy,
            roots = roots.len(),
            round_trips = session.round_trips(),
            "Load complete"
        );

        Ok(LoadOutcome {
            roots,
            strategy,
            session,
            phases,
        })
    }

    /// [`Loader::load`] with textual paths such as `"Posts.Comments"`
    pub async fn load_str(&self, root: RootQuery, strategy: LoadStrategy, paths: &[&str]) -> LoaderResult<LoadOutcome> {
        let paths = paths
            .iter()
            .map(|p| p.parse::<RelationshipPath>())
            .collect::<LoaderResult<Vec<_>>>()?;
        self.load(root, strategy, &paths).await
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("entities", &self.schema.entity_names().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}
