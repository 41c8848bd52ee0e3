//! Host topology aggregation.
//!
//! Given one page of hosts, resolves each host's (set, modules) placement
//! inside a business:
//!
//! 1. host ids are extracted from the page (any malformed id fails the
//!    whole request),
//! 2. relation rows for those hosts are folded into an [`Adjacency`],
//! 3. the distinct set and module ids are resolved to names,
//! 4. one [`HostTopo`] per host is assembled in page order.
//!
//! Lookups run sequentially on the caller's [`RequestContext`]; nothing is
//! cached between requests.

mod assemble;
mod names;
mod relation;

pub use assemble::{HostTopo, HostTopoResult, ModuleTopo, SetTopo, assemble};
pub use names::NameMaps;
pub use relation::{Adjacency, SetModules};

use crate::config::TopoConfig;
use crate::core::types::HostPage;
use crate::core::{HostRecord, Record, RequestContext, Result};
use crate::storage::{Filter, FindOptions, Store};
use tracing::{Instrument, Level, event, info_span};

/// Store access bound to one request.
pub struct TopoLookup<'a> {
    store: &'a dyn Store,
    ctx: &'a RequestContext,
    config: &'a TopoConfig,
}

impl<'a> TopoLookup<'a> {
    pub fn new(store: &'a dyn Store, ctx: &'a RequestContext, config: &'a TopoConfig) -> Self {
        Self { store, ctx, config }
    }

    async fn fetch(
        &self,
        collection: &str,
        filter: &Filter,
        opts: &FindOptions,
    ) -> Result<Vec<Record>> {
        self.ctx
            .run_within(
                self.config.fetch_timeout,
                self.store.find(collection, filter, opts),
            )
            .await
    }
}

/// Attach set/module topology to every host of `page`.
///
/// An empty page returns straight away with the page's count and no
/// lookups.
pub async fn build_host_topology(
    store: &dyn Store,
    ctx: &RequestContext,
    config: &TopoConfig,
    biz_id: i64,
    page: HostPage,
) -> Result<HostTopoResult> {
    let span = info_span!("topology.build", rid = %ctx.rid(), biz_id, hosts = page.info.len());
    resolve_page(store, ctx, config, biz_id, page)
        .instrument(span)
        .await
}

async fn resolve_page(
    store: &dyn Store,
    ctx: &RequestContext,
    config: &TopoConfig,
    biz_id: i64,
    page: HostPage,
) -> Result<HostTopoResult> {
    if page.info.is_empty() {
        return Ok(HostTopoResult {
            count: page.count,
            info: Vec::new(),
        });
    }

    let hosts = page
        .info
        .into_iter()
        .map(HostRecord::from_record)
        .collect::<Result<Vec<_>>>()
        .inspect_err(|err| {
            event!(Level::ERROR, error = %err, "host bk_host_id field invalid");
        })?;
    let host_ids: Vec<i64> = hosts.iter().map(|h| h.host_id).collect();

    let lookup = TopoLookup::new(store, ctx, config);
    let adjacency = lookup.resolve_relations(biz_id, &host_ids).await?;
    let names = lookup
        .resolve_names(adjacency.set_ids(), adjacency.module_ids())
        .await?;

    event!(
        Level::DEBUG,
        related_hosts = adjacency.host_count(),
        sets = names.sets.len(),
        modules = names.modules.len(),
        "host topology resolved"
    );

    Ok(assemble(page.count, hosts, &adjacency, &names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Stage, TopoError};
    use crate::core::types::{TABLE_MODULE, TABLE_MODULE_HOST_CONFIG, TABLE_SET};
    use crate::record;
    use crate::storage::{InMemoryStore, InstrumentedStore, StoreOp};

    #[tokio::test]
    async fn test_empty_page_issues_no_lookups() {
        let store = InstrumentedStore::new(InMemoryStore::new());
        let ctx = RequestContext::new();
        let page = HostPage {
            count: 12,
            info: Vec::new(),
        };

        let result = build_host_topology(&store, &ctx, &TopoConfig::default(), 3, page)
            .await
            .unwrap();
        assert_eq!(result.count, 12);
        assert!(result.info.is_empty());
        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_malformed_host_id_aborts_before_lookups() {
        let store = InstrumentedStore::new(InMemoryStore::new());
        let ctx = RequestContext::new();
        let page = HostPage {
            count: 2,
            info: vec![record! {"bk_host_id" => 1}, record! {"bk_host_id" => "abc"}],
        };

        let err = build_host_topology(&store, &ctx, &TopoConfig::default(), 3, page)
            .await
            .unwrap_err();
        assert!(matches!(err, TopoError::TypeCoercion { .. }));
        assert_eq!(store.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_lookup_sequence() {
        let inner = InMemoryStore::new();
        inner
            .insert_many(
                TABLE_MODULE_HOST_CONFIG,
                vec![record! {"bk_biz_id" => 3, "bk_host_id" => 1, "bk_set_id" => 10, "bk_module_id" => 100}],
            )
            .await
            .unwrap();
        let store = InstrumentedStore::new(inner);
        let ctx = RequestContext::new();
        let page = HostPage {
            count: 1,
            info: vec![record! {"bk_host_id" => 1}],
        };

        let result = build_host_topology(&store, &ctx, &TopoConfig::default(), 3, page)
            .await
            .unwrap();
        assert_eq!(result.info[0].topo[0].set_name, "");
        assert_eq!(store.calls(StoreOp::Find, TABLE_MODULE_HOST_CONFIG), 1);
        assert_eq!(store.calls(StoreOp::Find, TABLE_SET), 1);
        assert_eq!(store.calls(StoreOp::Find, TABLE_MODULE), 1);
    }

    #[tokio::test]
    async fn test_no_partial_result_when_names_fail() {
        let inner = InMemoryStore::new();
        inner
            .insert_many(
                TABLE_MODULE_HOST_CONFIG,
                vec![record! {"bk_biz_id" => 3, "bk_host_id" => 1, "bk_set_id" => 10, "bk_module_id" => 100}],
            )
            .await
            .unwrap();
        let store = InstrumentedStore::new(inner);
        store.fail_on(StoreOp::Find, TABLE_SET, "read timeout");
        let ctx = RequestContext::new();
        let page = HostPage {
            count: 1,
            info: vec![record! {"bk_host_id" => 1}],
        };

        let err = build_host_topology(&store, &ctx, &TopoConfig::default(), 3, page)
            .await
            .unwrap_err();
        assert!(matches!(err, TopoError::Aggregation { stage: Stage::SetNames, .. }));
        assert_eq!(store.calls(StoreOp::Find, TABLE_MODULE), 0);
    }
}
