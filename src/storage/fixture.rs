//! JSON fixture format for seeding and saving an [`InMemoryStore`].
//!
//! ```json
//! {
//!   "collections": { "cc_HostBase": [ { "bk_host_id": 1 } ] },
//!   "indexes": { "cc_HostBase": [ { "name": "bk_cloud_id_1", "keys": [["bk_cloud_id", 1]] } ] }
//! }
//! ```

use super::{Collection, IndexSpec, InMemoryStore, Store};
use crate::core::{Record, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub collections: BTreeMap<String, Vec<Record>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub indexes: BTreeMap<String, Vec<IndexSpec>>,
}

impl Fixture {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }

    /// Builds a store holding the fixture's documents and indexes.
    pub async fn into_store(self) -> Result<InMemoryStore> {
        let store = InMemoryStore::new();
        for (name, docs) in self.collections {
            store.insert_many(&name, docs).await?;
        }
        for (name, indexes) in self.indexes {
            for index in &indexes {
                store.create_index(&name, index).await?;
            }
        }
        Ok(store)
    }

    pub async fn from_store(store: &InMemoryStore) -> Self {
        Self::from_collections(store.snapshot().await)
    }

    fn from_collections(collections: Vec<Collection>) -> Self {
        let mut fixture = Self::default();
        for coll in collections {
            if !coll.indexes().is_empty() {
                fixture
                    .indexes
                    .insert(coll.name().to_string(), coll.indexes().to_vec());
            }
            fixture
                .collections
                .insert(coll.name().to_string(), coll.docs().to_vec());
        }
        fixture
    }
}
