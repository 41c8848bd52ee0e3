use super::TopoLookup;
use crate::core::ids::unique_ids;
use crate::core::types::{
    FIELD_BIZ_ID, FIELD_HOST_ID, FIELD_MODULE_ID, FIELD_SET_ID, TABLE_MODULE_HOST_CONFIG,
};
use crate::core::{RelationRow, Result, Stage};
use crate::storage::{Filter, FindOptions};
use std::collections::BTreeMap;
use tracing::{Level, event};

/// set id -> module ids, in relation-row order.
pub type SetModules = BTreeMap<i64, Vec<i64>>;

/// host id -> set id -> module ids, plus every set and module id seen.
///
/// Module ids are kept exactly as the relation rows list them; duplicates
/// are not collapsed here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Adjacency {
    hosts: BTreeMap<i64, SetModules>,
    set_ids: Vec<i64>,
    module_ids: Vec<i64>,
}

impl Adjacency {
    pub fn from_rows(rows: impl IntoIterator<Item = RelationRow>) -> Self {
        let mut hosts: BTreeMap<i64, SetModules> = BTreeMap::new();
        let mut set_ids = Vec::new();
        let mut module_ids = Vec::new();

        for row in rows {
            set_ids.push(row.set_id);
            module_ids.push(row.module_id);
            hosts
                .entry(row.host_id)
                .or_default()
                .entry(row.set_id)
                .or_default()
                .push(row.module_id);
        }

        Self {
            hosts,
            set_ids: unique_ids(set_ids),
            module_ids: unique_ids(module_ids),
        }
    }

    pub fn get(&self, host_id: i64) -> Option<&SetModules> {
        self.hosts.get(&host_id)
    }

    /// Distinct set ids referenced by any host.
    pub fn set_ids(&self) -> &[i64] {
        &self.set_ids
    }

    /// Distinct module ids referenced by any host.
    pub fn module_ids(&self) -> &[i64] {
        &self.module_ids
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl TopoLookup<'_> {
    /// Fetch the host/set/module relation rows of `host_ids` within the
    /// business and fold them into an [`Adjacency`]. No query is issued
    /// for an empty host list.
    pub async fn resolve_relations(&self, biz_id: i64, host_ids: &[i64]) -> Result<Adjacency> {
        if host_ids.is_empty() {
            return Ok(Adjacency::default());
        }

        let filter = Filter::and([
            Filter::eq(FIELD_BIZ_ID, biz_id),
            Filter::in_ids(FIELD_HOST_ID, host_ids),
        ]);
        let opts = FindOptions::new().fields([FIELD_SET_ID, FIELD_MODULE_ID, FIELD_HOST_ID]);

        let records = self
            .fetch(TABLE_MODULE_HOST_CONFIG, &filter, &opts)
            .await
            .map_err(|err| {
                event!(
                    Level::ERROR,
                    rid = %self.ctx.rid(),
                    biz_id,
                    hosts = host_ids.len(),
                    error = %err,
                    "read host module relation failed"
                );
                err.at(Stage::Relations)
            })?;

        let rows = records
            .iter()
            .map(RelationRow::from_record)
            .collect::<Result<Vec<_>>>()
            .inspect_err(|err| {
                event!(Level::ERROR, rid = %self.ctx.rid(), error = %err, "relation row invalid");
            })?;

        Ok(Adjacency::from_rows(rows))
    }
}
