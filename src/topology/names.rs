use super::TopoLookup;
use crate::core::types::{
    FIELD_MODULE_ID, FIELD_MODULE_NAME, FIELD_SET_ID, FIELD_SET_NAME, TABLE_MODULE, TABLE_SET,
};
use crate::core::{NamedNode, Result, Stage};
use crate::storage::{Filter, FindOptions};
use std::collections::HashMap;
use tracing::{Level, event};

/// id -> name for the sets and modules a topology response references.
///
/// Ids missing from the store are simply absent; lookups for them yield
/// an empty name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMaps {
    pub sets: HashMap<i64, String>,
    pub modules: HashMap<i64, String>,
}

impl NameMaps {
    pub fn set_name(&self, set_id: i64) -> &str {
        self.sets.get(&set_id).map(String::as_str).unwrap_or_default()
    }

    pub fn module_name(&self, module_id: i64) -> &str {
        self.modules
            .get(&module_id)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

impl TopoLookup<'_> {
    /// One lookup for set names, one for module names. An empty id list
    /// skips its lookup.
    pub async fn resolve_names(&self, set_ids: &[i64], module_ids: &[i64]) -> Result<NameMaps> {
        let sets = self
            .name_map(Stage::SetNames, TABLE_SET, FIELD_SET_ID, FIELD_SET_NAME, set_ids)
            .await?;
        let modules = self
            .name_map(
                Stage::ModuleNames,
                TABLE_MODULE,
                FIELD_MODULE_ID,
                FIELD_MODULE_NAME,
                module_ids,
            )
            .await?;
        Ok(NameMaps { sets, modules })
    }

    async fn name_map(
        &self,
        stage: Stage,
        collection: &str,
        id_field: &str,
        name_field: &str,
        ids: &[i64],
    ) -> Result<HashMap<i64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let filter = Filter::in_ids(id_field, ids);
        let opts = FindOptions::new().fields([id_field, name_field]);
        let records = self
            .fetch(collection, &filter, &opts)
            .await
            .map_err(|err| {
                event!(
                    Level::ERROR,
                    rid = %self.ctx.rid(),
                    collection,
                    ids = ids.len(),
                    error = %err,
                    "name lookup failed"
                );
                err.at(stage)
            })?;

        let mut names = HashMap::with_capacity(records.len());
        for record in &records {
            let node = NamedNode::from_record(record, id_field, name_field).inspect_err(|err| {
                event!(
                    Level::ERROR,
                    rid = %self.ctx.rid(),
                    collection,
                    error = %err,
                    "name record invalid"
                );
            })?;
            names.insert(node.id, node.name);
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TopoConfig;
    use crate::core::{RequestContext, TopoError};
    use crate::record;
    use crate::storage::{InMemoryStore, InstrumentedStore, StoreOp};

    async fn name_store() -> InstrumentedStore<InMemoryStore> {
        let store = InMemoryStore::new();
        store
            .insert_many(
                TABLE_SET,
                vec![
                    record! {"bk_set_id" => 10, "bk_set_name" => "SetA"},
                    record! {"bk_set_id" => 20, "bk_set_name" => "SetB"},
                ],
            )
            .await
            .unwrap();
        store
            .insert_many(
                TABLE_MODULE,
                vec![
                    record! {"bk_module_id" => 100, "bk_module_name" => "Mod1"},
                    record! {"bk_module_id" => 101, "bk_module_name" => "Mod2"},
                ],
            )
            .await
            .unwrap();
        InstrumentedStore::new(store)
    }

    #[tokio::test]
    async fn test_resolve_names_two_lookups() {
        let store = name_store().await;
        let ctx = RequestContext::new();
        let config = TopoConfig::default();
        let lookup = TopoLookup::new(&store, &ctx, &config);

        let names = lookup.resolve_names(&[10, 20], &[100, 101]).await.unwrap();
        assert_eq!(names.set_name(10), "SetA");
        assert_eq!(names.module_name(101), "Mod2");
        assert_eq!(store.calls(StoreOp::Find, TABLE_SET), 1);
        assert_eq!(store.calls(StoreOp::Find, TABLE_MODULE), 1);
    }

    #[tokio::test]
    async fn test_missing_ids_resolve_to_empty_name() {
        let store = name_store().await;
        let ctx = RequestContext::new();
        let config = TopoConfig::default();
        let lookup = TopoLookup::new(&store, &ctx, &config);

        let names = lookup.resolve_names(&[10, 99], &[999]).await.unwrap();
        assert_eq!(names.sets.len(), 1);
        assert_eq!(names.set_name(99), "");
        assert_eq!(names.module_name(999), "");
    }

    #[tokio::test]
    async fn test_empty_id_lists_skip_lookups() {
        let store = name_store().await;
        let ctx = RequestContext::new();
        let config = TopoConfig::default();
        let lookup = TopoLookup::new(&store, &ctx, &config);

        let names = lookup.resolve_names(&[], &[]).await.unwrap();
        assert_eq!(names, NameMaps::default());
        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_name_record_fails() {
        let store = InMemoryStore::new();
        store
            .insert_many(TABLE_SET, vec![record! {"bk_set_id" => 10, "bk_set_name" => false}])
            .await
            .unwrap();
        let ctx = RequestContext::new();
        let config = TopoConfig::default();
        let lookup = TopoLookup::new(&store, &ctx, &config);

        let err = lookup.resolve_names(&[10], &[]).await.unwrap_err();
        assert!(matches!(err, TopoError::TypeCoercion { ref field, .. } if field == FIELD_SET_NAME));
    }

    #[tokio::test]
    async fn test_module_lookup_failure_aborts() {
        let store = name_store().await;
        store.fail_on(StoreOp::Find, TABLE_MODULE, "shard down");
        let ctx = RequestContext::new();
        let config = TopoConfig::default();
        let lookup = TopoLookup::new(&store, &ctx, &config);

        let err = lookup.resolve_names(&[10], &[100]).await.unwrap_err();
        assert!(matches!(err, TopoError::Aggregation { stage: Stage::ModuleNames, .. }));
        assert!(matches!(err.root_cause(), TopoError::Lookup { .. }));
    }
}
