use super::params::{
    HostModuleFind, ListHosts, ListHostsParameter, ListHostsWithNoBizParameter, Page,
};
use crate::config::TopoConfig;
use crate::core::ids::{collect_i64, unique_ids};
use crate::core::types::{
    FIELD_BIZ_ID, FIELD_HOST_ID, FIELD_MODULE_ID, FIELD_SET_ID, TABLE_HOST,
    TABLE_MODULE_HOST_CONFIG, TABLE_SET,
};
use crate::core::{HostPage, RequestContext, Result, Stage, TopoError};
use crate::cursor::{CursorMode, PageCursor};
use crate::storage::{Filter, FindOptions, Store};
use crate::topology::{self, HostTopoResult};
use std::sync::Arc;
use tracing::{Instrument, Level, event, info_span};

/// Host inventory queries over a [`Store`].
#[derive(Clone)]
pub struct HostService {
    store: Arc<dyn Store>,
    config: TopoConfig,
}

impl HostService {
    pub fn new(store: Arc<dyn Store>, config: TopoConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn config(&self) -> &TopoConfig {
        &self.config
    }

    /// Hosts of a business, optionally narrowed by sets (ids or a set
    /// condition), modules and host properties.
    pub async fn list_biz_hosts(
        &self,
        ctx: &RequestContext,
        biz_id: i64,
        param: ListHostsParameter,
    ) -> Result<HostPage> {
        validate_biz_id(biz_id)?;
        self.validate_page(ctx, &param.page)?;
        param.validate().inspect_err(|err| {
            event!(Level::ERROR, rid = %ctx.rid(), error = %err, "list biz hosts: invalid parameter");
        })?;

        let set_ids = match (param.set_ids, param.set_cond) {
            (Some(ids), _) => ids,
            (None, Some(cond)) if cond != Filter::All => {
                let ids = self.set_ids_by_cond(ctx, cond).await?;
                if ids.is_empty() {
                    return Ok(HostPage::default());
                }
                ids
            }
            (None, _) => Vec::new(),
        };

        let option = ListHosts {
            biz_id: Some(biz_id),
            set_ids,
            module_ids: param.module_ids,
            host_property_filter: param.host_property_filter,
            fields: param.fields,
            page: param.page,
        };
        self.list_hosts(ctx, &option).await
    }

    /// Hosts regardless of business placement.
    pub async fn list_hosts_without_biz(
        &self,
        ctx: &RequestContext,
        param: ListHostsWithNoBizParameter,
    ) -> Result<HostPage> {
        self.validate_page(ctx, &param.page)?;
        let option = ListHosts {
            host_property_filter: param.host_property_filter,
            fields: param.fields,
            page: param.page,
            ..Default::default()
        };
        self.list_hosts(ctx, &option).await
    }

    /// Hosts placed in any of the given modules of a business.
    pub async fn find_module_hosts(
        &self,
        ctx: &RequestContext,
        param: HostModuleFind,
    ) -> Result<HostPage> {
        validate_biz_id(param.biz_id)?;
        if param.module_ids.is_empty() {
            return Err(TopoError::Validation("bk_module_ids".to_string()));
        }
        self.validate_page(ctx, &param.page)?;

        let option = ListHosts {
            biz_id: Some(param.biz_id),
            module_ids: param.module_ids,
            fields: param.fields,
            page: param.page,
            ..Default::default()
        };
        self.list_hosts(ctx, &option).await
    }

    /// Hosts of a business with their set/module placement attached.
    pub async fn list_biz_hosts_topo(
        &self,
        ctx: &RequestContext,
        biz_id: i64,
        param: ListHostsWithNoBizParameter,
    ) -> Result<HostTopoResult> {
        let span = info_span!("host.list_biz_hosts_topo", rid = %ctx.rid(), biz_id);
        self.biz_hosts_topo(ctx, biz_id, param)
            .instrument(span)
            .await
    }

    async fn biz_hosts_topo(
        &self,
        ctx: &RequestContext,
        biz_id: i64,
        param: ListHostsWithNoBizParameter,
    ) -> Result<HostTopoResult> {
        validate_biz_id(biz_id)?;
        self.validate_page(ctx, &param.page)?;

        let option = ListHosts {
            biz_id: Some(biz_id),
            host_property_filter: param.host_property_filter,
            fields: param.fields,
            page: param.page,
            ..Default::default()
        };
        let page = self.list_hosts(ctx, &option).await?;
        topology::build_host_topology(self.store(), ctx, &self.config, biz_id, page).await
    }

    /// One page of hosts plus the unpaged match count.
    ///
    /// When the option is scoped by business, sets or modules, the
    /// candidate hosts are the distinct hosts of the matching relation
    /// rows; no candidates means an empty page without touching the host
    /// collection.
    pub async fn list_hosts(&self, ctx: &RequestContext, option: &ListHosts) -> Result<HostPage> {
        let mut terms = Vec::new();
        if option.is_topology_scoped() {
            let host_ids = self.scoped_host_ids(ctx, option).await?;
            if host_ids.is_empty() {
                return Ok(HostPage::default());
            }
            terms.push(Filter::in_ids(FIELD_HOST_ID, &host_ids));
        }
        if let Some(property) = &option.host_property_filter {
            terms.push(property.clone());
        }
        let filter = Filter::and(terms);

        let mut fields = option.fields.clone();
        if !fields.is_empty() && !fields.iter().any(|f| f == FIELD_HOST_ID) {
            fields.push(FIELD_HOST_ID.to_string());
        }
        let mut opts = FindOptions::new()
            .fields(fields)
            .start(option.page.start)
            .sort(
                option
                    .page
                    .sort
                    .clone()
                    .unwrap_or_else(|| FIELD_HOST_ID.to_string()),
            );
        if let Some(limit) = option.page.effective_limit() {
            opts = opts.limit(limit);
        }

        let timeout = self.config.fetch_timeout;
        let count = ctx
            .run_within(timeout, self.store.count(TABLE_HOST, &filter))
            .await
            .inspect_err(|err| {
                event!(Level::ERROR, rid = %ctx.rid(), error = %err, "count hosts failed");
            })?;
        let info = ctx
            .run_within(timeout, self.store.find(TABLE_HOST, &filter, &opts))
            .await
            .inspect_err(|err| {
                event!(Level::ERROR, rid = %ctx.rid(), error = %err, "find hosts failed");
            })?;

        Ok(HostPage { count, info })
    }

    async fn scoped_host_ids(&self, ctx: &RequestContext, option: &ListHosts) -> Result<Vec<i64>> {
        let mut terms = Vec::new();
        if let Some(biz_id) = option.biz_id {
            terms.push(Filter::eq(FIELD_BIZ_ID, biz_id));
        }
        if !option.set_ids.is_empty() {
            terms.push(Filter::in_ids(FIELD_SET_ID, &option.set_ids));
        }
        if !option.module_ids.is_empty() {
            terms.push(Filter::in_ids(FIELD_MODULE_ID, &option.module_ids));
        }

        let mut host_ids = Vec::new();
        PageCursor::new(
            self.store(),
            ctx,
            TABLE_MODULE_HOST_CONFIG,
            Filter::and(terms),
        )
        .mode(CursorMode::Advancing)
        .fields([FIELD_HOST_ID])
        .sort(FIELD_HOST_ID)
        .step(self.config.page_step)
        .stage(Stage::HostPage)
        .fetch_timeout(self.config.fetch_timeout)
        .for_each_page(|page| {
            let ids = collect_i64(&page, FIELD_HOST_ID);
            let extended = ids.map(|ids| host_ids.extend(ids));
            async move { extended }
        })
        .await?;

        Ok(unique_ids(host_ids))
    }

    async fn set_ids_by_cond(&self, ctx: &RequestContext, cond: Filter) -> Result<Vec<i64>> {
        let mut set_ids = Vec::new();
        PageCursor::new(self.store(), ctx, TABLE_SET, cond)
            .mode(CursorMode::Advancing)
            .fields([FIELD_SET_ID])
            .sort(FIELD_SET_ID)
            .step(self.config.page_step)
            .stage(Stage::SetScan)
            .fetch_timeout(self.config.fetch_timeout)
            .for_each_page(|page| {
                let extended = collect_i64(&page, FIELD_SET_ID).map(|ids| set_ids.extend(ids));
                async move { extended }
            })
            .await
            .inspect_err(|err| {
                event!(Level::ERROR, rid = %ctx.rid(), error = %err, "get set ids by condition failed");
            })?;
        Ok(unique_ids(set_ids))
    }

    fn validate_page(&self, ctx: &RequestContext, page: &Page) -> Result<()> {
        page.validate(self.config.max_page_limit).inspect_err(|_| {
            event!(Level::ERROR, rid = %ctx.rid(), limit = page.limit, "page limit illegal");
        })
    }
}

fn validate_biz_id(biz_id: i64) -> Result<()> {
    if biz_id == 0 {
        return Err(TopoError::Validation(FIELD_BIZ_ID.to_string()));
    }
    Ok(())
}
