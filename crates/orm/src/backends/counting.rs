//! Round-trip accounting for one loader invocation
//!
//! Wraps a shared [`DataSource`] with a counter and a trip log that belong to
//! a single invocation. Errors come back already attributed to the
//! relationship path and key being resolved.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::core::{DataSource, RoundTrip, RoundTripKind};
use crate::error::{LoadError, LoaderError, LoaderResult, SourceResult};
use crate::query::Predicate;
use crate::record::{Key, Record};
use crate::relationships::JoinSpec;

/// Where a round trip is issued from, for error attribution
#[derive(Debug, Clone, Copy)]
pub struct TripContext<'a> {
    pub path: &'a str,
    pub key: Option<Key>,
}

impl<'a> TripContext<'a> {
    pub fn root() -> Self {
        Self { path: "", key: None }
    }

    pub fn path(path: &'a str) -> Self {
        Self { path, key: None }
    }

    pub fn entry(path: &'a str, key: Key) -> Self {
        Self { path, key: Some(key) }
    }
}

/// A data source seen through one invocation's counter
#[derive(Clone)]
pub struct CountingSource {
    inner: Arc<dyn DataSource>,
    counter: Arc<AtomicUsize>,
    log: Arc<Mutex<Vec<RoundTrip>>>,
    cancel: CancellationToken,
}

impl CountingSource {
    pub fn new(inner: Arc<dyn DataSource>, cancel: CancellationToken) -> Self {
        Self {
            inner,
            counter: Arc::new(AtomicUsize::new(0)),
            log: Arc::new(Mutex::new(Vec::new())),
            cancel,
        }
    }

    /// Round trips issued so far, failed ones included
    pub fn round_trips(&self) -> usize {
        self.counter.load(Ordering::SeqCst)
    }

    /// Snapshot of the trip log, in issue order
    pub fn log(&self) -> Vec<RoundTrip> {
        self.log.lock().clone()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn scan_all(
        &self,
        ctx: TripContext<'_>,
        entity: &str,
        predicate: Option<&Predicate>,
    ) -> LoaderResult<Vec<Record>> {
        let seq = self.begin()?;
        let result = self.inner.scan_all(entity, predicate).await;
        self.finish(ctx, seq, RoundTripKind::ScanAll, entity, 0, predicate, result, Vec::len)
    }

    pub async fn scan_by_foreign_key(
        &self,
        ctx: TripContext<'_>,
        entity: &str,
        fk_attribute: &str,
        parent_keys: &BTreeSet<Key>,
        predicate: Option<&Predicate>,
    ) -> LoaderResult<Vec<Record>> {
        let seq = self.begin()?;
        let result = self
            .inner
            .scan_by_foreign_key(entity, fk_attribute, parent_keys, predicate)
            .await;
        self.finish(
            ctx,
            seq,
            RoundTripKind::ScanByForeignKey,
            entity,
            parent_keys.len(),
            predicate,
            result,
            Vec::len,
        )
    }

    pub async fn scan_by_join(
        &self,
        ctx: TripContext<'_>,
        target: &str,
        join: &JoinSpec,
        owner_keys: &BTreeSet<Key>,
        predicate: Option<&Predicate>,
    ) -> LoaderResult<Vec<(Key, Record)>> {
        let seq = self.begin()?;
        let result = self.inner.scan_by_join(target, join, owner_keys, predicate).await;
        self.finish(
            ctx,
            seq,
            RoundTripKind::ScanByJoin,
            target,
            owner_keys.len(),
            predicate,
            result,
            Vec::len,
        )
    }

    pub async fn lookup_by_key(
        &self,
        ctx: TripContext<'_>,
        entity: &str,
        key: Key,
    ) -> LoaderResult<Option<Record>> {
        let seq = self.begin()?;
        let result = self.inner.lookup_by_key(entity, key).await;
        self.finish(
            ctx,
            seq,
            RoundTripKind::LookupByKey,
            entity,
            1,
            None,
            result,
            |found| usize::from(found.is_some()),
        )
    }

    /// Check cancellation, then claim the next sequence number
    fn begin(&self) -> LoaderResult<usize> {
        if self.cancel.is_cancelled() {
            tracing::debug!("Round trip skipped: load cancelled");
            return Err(LoaderError::Cancelled);
        }
        Ok(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish<T>(
        &self,
        ctx: TripContext<'_>,
        seq: usize,
        kind: RoundTripKind,
        entity: &str,
        key_count: usize,
        predicate: Option<&Predicate>,
        result: SourceResult<T>,
        rows_of: impl Fn(&T) -> usize,
    ) -> LoaderResult<T> {
        let rows = result.as_ref().map(&rows_of).unwrap_or(0);
        let trip = RoundTrip {
            seq,
            kind,
            entity: entity.to_string(),
            key_count,
            rows,
            filter: predicate.map(|p| p.to_string()),
        };

        match &result {
            Ok(_) => tracing::debug!(path = ctx.path, "Round trip {}", trip),
            Err(e) => tracing::warn!(path = ctx.path, key = ?ctx.key, "Round trip {} failed: {}", trip, e),
        }
        // Trips issued concurrently can finish out of order
        let mut log = self.log.lock();
        let at = log.partition_point(|t| t.seq < seq);
        log.insert(at, trip);
        drop(log);

        result.map_err(|source| LoadError::new(ctx.path, ctx.key, source).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::memory::InMemoryStore;
    use crate::backends::DataSink;
    use crate::error::SourceError;
    use crate::relationships::blog_schema;

    async fn store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new(Arc::new(blog_schema().unwrap())));
        store
            .insert(Record::new("Blog", 1).with("Id", 1).with("Title", "Tech Blog"))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_each_call_is_one_round_trip() {
        let store = store().await;
        let source = CountingSource::new(store, CancellationToken::new());

        let blogs = source.scan_all(TripContext::root(), "Blog", None).await.unwrap();
        assert_eq!(blogs.len(), 1);

        let keys: BTreeSet<Key> = (1..=50).collect();
        let posts = source
            .scan_by_foreign_key(TripContext::path("Posts"), "Post", "BlogId", &keys, None)
            .await
            .unwrap();
        assert!(posts.is_empty());

        let found = source
            .lookup_by_key(TripContext::entry("Blog", 9), "Blog", 1)
            .await
            .unwrap();
        assert!(found.is_some());

        assert_eq!(source.round_trips(), 3);
        let log = source.log();
        assert_eq!(log.len(), 3);
        assert_eq!(log[1].kind, RoundTripKind::ScanByForeignKey);
        assert_eq!(log[1].key_count, 50);
        assert_eq!(log[2].rows, 1);
    }

    #[tokio::test]
    async fn test_log_follows_issue_order() {
        let store = store().await;
        let source = CountingSource::new(store, CancellationToken::new());

        let first = source.begin().unwrap();
        let second = source.begin().unwrap();
        let third = source.begin().unwrap();
        for seq in [third, first, second] {
            source
                .finish(
                    TripContext::root(),
                    seq,
                    RoundTripKind::ScanAll,
                    "Blog",
                    0,
                    None,
                    Ok(Vec::<Record>::new()),
                    Vec::len,
                )
                .unwrap();
        }

        let seqs: Vec<usize> = source.log().iter().map(|t| t.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_cancelled_token_issues_nothing() {
        let store = store().await;
        let cancel = CancellationToken::new();
        let source = CountingSource::new(store, cancel.clone());

        cancel.cancel();
        let result = source.scan_all(TripContext::root(), "Blog", None).await;
        assert_eq!(result, Err(LoaderError::Cancelled));
        assert_eq!(source.round_trips(), 0);
        assert!(source.log().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_attributed() {
        let store = store().await;
        let source = CountingSource::new(store, CancellationToken::new());

        let result = source
            .scan_all(TripContext::entry("Posts", 4), "Nope", None)
            .await;
        assert_eq!(
            result,
            Err(LoaderError::Load(LoadError::new(
                "Posts",
                Some(4),
                SourceError::UnknownEntity("Nope".to_string())
            )))
        );
        assert_eq!(source.round_trips(), 1);
        assert_eq!(source.log()[0].rows, 0);
    }
}
