use super::batch::{MigrationReport, drop_field_where_exists, ensure_index};
use super::upgrader::UpgradeStep;
use crate::config::TopoConfig;
use crate::core::types::{
    FIELD_CLOUD_ID, FIELD_ID, FIELD_SET_ID, FIELD_SET_TEMPLATE_VERSION, FIELD_VERSION, TABLE_HOST,
    TABLE_PLAT, TABLE_SET, TABLE_SET_TEMPLATE,
};
use crate::core::{RequestContext, Result};
use crate::storage::{IndexSpec, Store};
use async_trait::async_trait;

pub const CLOUD_ID_INDEX: &str = "bk_cloud_id_1";

/// Non-unique background index on `bk_cloud_id` for hosts and cloud areas.
pub struct AddCloudIdIndex;

impl AddCloudIdIndex {
    pub const VERSION: &'static str = "x20.10.16.11";

    pub fn index() -> IndexSpec {
        IndexSpec::new(CLOUD_ID_INDEX)
            .key(FIELD_CLOUD_ID, 1)
            .background(true)
    }
}

#[async_trait]
impl UpgradeStep for AddCloudIdIndex {
    fn version(&self) -> &str {
        Self::VERSION
    }

    fn name(&self) -> &str {
        "add_cloud_id_index"
    }

    async fn run(
        &self,
        store: &dyn Store,
        ctx: &RequestContext,
        config: &TopoConfig,
    ) -> Result<MigrationReport> {
        let index = Self::index();
        let mut report = MigrationReport::default();
        for collection in [TABLE_HOST, TABLE_PLAT] {
            let outcome = ensure_index(store, ctx, config, collection, &index).await?;
            report.record_index(outcome);
        }
        Ok(report)
    }
}

/// Removes the retired set template version from templates and sets.
pub struct DropSetTemplateVersion;

impl DropSetTemplateVersion {
    pub const VERSION: &'static str = "y3.9.202106301723";
}

#[async_trait]
impl UpgradeStep for DropSetTemplateVersion {
    fn version(&self) -> &str {
        Self::VERSION
    }

    fn name(&self) -> &str {
        "drop_set_template_version_column"
    }

    async fn run(
        &self,
        store: &dyn Store,
        ctx: &RequestContext,
        config: &TopoConfig,
    ) -> Result<MigrationReport> {
        let mut report = drop_field_where_exists(
            store,
            ctx,
            config,
            TABLE_SET_TEMPLATE,
            FIELD_ID,
            FIELD_VERSION,
        )
        .await?;
        let sets = drop_field_where_exists(
            store,
            ctx,
            config,
            TABLE_SET,
            FIELD_SET_ID,
            FIELD_SET_TEMPLATE_VERSION,
        )
        .await?;
        report.merge(&sets);
        Ok(report)
    }
}
