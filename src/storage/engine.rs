use super::{Filter, FindOptions, IndexSpec};
use crate::core::{Record, Result};
use async_trait::async_trait;

/// Storage collaborator - the document store the topology queries and
/// migrations run against.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch the matching documents, sorted, skipped, limited and projected
    /// per `opts`.
    async fn find(&self, collection: &str, filter: &Filter, opts: &FindOptions)
    -> Result<Vec<Record>>;

    /// Count the matching documents, ignoring paging.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64>;

    /// Create an index. Fails with `TopoError::DuplicateIndex` when an index
    /// with the same name or key spec exists.
    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()>;

    /// Remove `fields` from every matching document. Returns the number of
    /// documents touched.
    async fn drop_fields(&self, collection: &str, filter: &Filter, fields: &[String])
    -> Result<u64>;

    /// Set `changes` on every matching document. Returns the number of
    /// documents touched.
    async fn update(&self, collection: &str, filter: &Filter, changes: &Record) -> Result<u64>;
}
