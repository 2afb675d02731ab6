#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use navload_orm::backends::DataSource;
use navload_orm::relationships::JoinSpec;
use navload_orm::seed::{seed_demo_data, seed_generated};
use navload_orm::{blog_schema, InMemoryStore, Key, Loader, Predicate, Record, SchemaModel, SourceConfig, SourceResult};

pub fn schema() -> Arc<SchemaModel> {
    Arc::new(blog_schema().expect("blog schema is valid"))
}

/// The three demo blogs with their posts, comments and tags
pub async fn demo_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new(schema()));
    assert!(seed_demo_data(store.as_ref()).await.unwrap());
    store
}

/// `blogs` blogs with `posts` posts each and `comments` comments per post
pub async fn generated_store(blogs: usize, posts: usize, comments: usize) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new(schema()));
    seed_generated(store.as_ref(), blogs, posts, comments).await.unwrap();
    store
}

pub fn empty_store() -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::new(schema()))
}

pub fn slow_store(config: SourceConfig) -> Arc<InMemoryStore> {
    Arc::new(InMemoryStore::with_config(schema(), config))
}

pub fn loader(store: Arc<InMemoryStore>) -> Loader {
    let schema = store.schema().clone();
    Loader::new(schema, store)
}

/// A source that pretends one record was deleted behind the loader's back
pub struct HidingSource {
    pub inner: Arc<InMemoryStore>,
    pub entity: &'static str,
    pub key: Key,
}

impl HidingSource {
    fn visible(&self, record: &Record) -> bool {
        !(record.entity == self.entity && record.key == self.key)
    }
}

#[async_trait]
impl DataSource for HidingSource {
    async fn scan_all(&self, entity: &str, predicate: Option<&Predicate>) -> SourceResult<Vec<Record>> {
        let records = self.inner.scan_all(entity, predicate).await?;
        Ok(records.into_iter().filter(|r| self.visible(r)).collect())
    }

    async fn scan_by_foreign_key(
        &self,
        entity: &str,
        fk_attribute: &str,
        parent_keys: &BTreeSet<Key>,
        predicate: Option<&Predicate>,
    ) -> SourceResult<Vec<Record>> {
        let records = self
            .inner
            .scan_by_foreign_key(entity, fk_attribute, parent_keys, predicate)
            .await?;
        Ok(records.into_iter().filter(|r| self.visible(r)).collect())
    }

    async fn scan_by_join(
        &self,
        target: &str,
        join: &JoinSpec,
        owner_keys: &BTreeSet<Key>,
        predicate: Option<&Predicate>,
    ) -> SourceResult<Vec<(Key, Record)>> {
        let pairs = self.inner.scan_by_join(target, join, owner_keys, predicate).await?;
        Ok(pairs.into_iter().filter(|(_, r)| self.visible(r)).collect())
    }

    async fn lookup_by_key(&self, entity: &str, key: Key) -> SourceResult<Option<Record>> {
        let record = self.inner.lookup_by_key(entity, key).await?;
        Ok(record.filter(|r| self.visible(r)))
    }
}
