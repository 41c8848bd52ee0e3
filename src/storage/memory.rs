use super::{Collection, Filter, FindOptions, IndexSpec, Store};
use crate::core::{Record, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// `Store` backed by process memory. A collection that was never written
/// reads as empty.
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Insert documents, creating the collection if needed.
    pub async fn insert_many(
        &self,
        collection: &str,
        docs: impl IntoIterator<Item = Record>,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        let coll = collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection::new(collection));
        for doc in docs {
            coll.insert(doc)?;
        }
        Ok(())
    }

    pub async fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        let collections = self.collections.read().await;
        collections
            .get(collection)
            .map(|c| c.indexes().to_vec())
            .unwrap_or_default()
    }

    /// Copy of every collection, sorted by name.
    pub async fn snapshot(&self) -> Vec<Collection> {
        let collections = self.collections.read().await;
        let mut out: Vec<Collection> = collections.values().cloned().collect();
        out.sort_by(|a, b| a.name().cmp(b.name()));
        out
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        opts: &FindOptions,
    ) -> Result<Vec<Record>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|c| c.find(filter, opts))
            .unwrap_or_default())
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map_or(0, |c| c.count(filter)))
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_insert_with(|| Collection::new(collection))
            .create_index(index)
    }

    async fn drop_fields(
        &self,
        collection: &str,
        filter: &Filter,
        fields: &[String],
    ) -> Result<u64> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .map_or(0, |c| c.drop_fields(filter, fields)))
    }

    async fn update(&self, collection: &str, filter: &Filter, changes: &Record) -> Result<u64> {
        let mut collections = self.collections.write().await;
        match collections.get_mut(collection) {
            Some(c) => c.update(filter, changes),
            None => Ok(0),
        }
    }
}
