use super::batch::MigrationReport;
use super::steps::{AddCloudIdIndex, DropSetTemplateVersion};
use crate::config::TopoConfig;
use crate::core::{RequestContext, Result, Stage, TopoError};
use crate::storage::Store;
use async_trait::async_trait;
use serde::Serialize;
use tracing::{Instrument, Level, event, info_span};

/// One versioned schema change.
///
/// Steps must be safe to run again after a partial or complete run.
#[async_trait]
pub trait UpgradeStep: Send + Sync {
    fn version(&self) -> &str;

    fn name(&self) -> &str;

    async fn run(
        &self,
        store: &dyn Store,
        ctx: &RequestContext,
        config: &TopoConfig,
    ) -> Result<MigrationReport>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub version: String,
    pub name: String,
    pub report: MigrationReport,
}

/// Registry of upgrade steps, run in version order.
pub struct Upgrader {
    steps: Vec<Box<dyn UpgradeStep>>,
    config: TopoConfig,
}

impl Upgrader {
    pub fn new(config: TopoConfig) -> Self {
        Self {
            steps: Vec::new(),
            config,
        }
    }

    /// Registry holding every step shipped with this crate.
    pub fn with_builtin_steps(config: TopoConfig) -> Self {
        let mut upgrader = Self::new(config);
        upgrader.steps.push(Box::new(AddCloudIdIndex));
        upgrader.steps.push(Box::new(DropSetTemplateVersion));
        upgrader
    }

    pub fn register(&mut self, step: Box<dyn UpgradeStep>) -> Result<()> {
        if self.steps.iter().any(|s| s.version() == step.version()) {
            return Err(TopoError::Validation(format!(
                "upgrade version '{}' registered twice",
                step.version()
            )));
        }
        self.steps.push(step);
        Ok(())
    }

    /// Registered versions, in the order [`run_all`](Self::run_all) uses.
    pub fn versions(&self) -> Vec<&str> {
        self.ordered().into_iter().map(|s| s.version()).collect()
    }

    /// Run every step once, stopping at the first failure.
    pub async fn run_all(&self, store: &dyn Store, ctx: &RequestContext) -> Result<Vec<StepOutcome>> {
        let mut outcomes = Vec::with_capacity(self.steps.len());
        for step in self.ordered() {
            ctx.check()?;
            let span = info_span!("migration.step", rid = %ctx.rid(), version = step.version(), name = step.name());
            let report = step
                .run(store, ctx, &self.config)
                .instrument(span)
                .await
                .map_err(|err| {
                    event!(
                        Level::ERROR,
                        rid = %ctx.rid(),
                        version = step.version(),
                        error = %err,
                        "upgrade step failed"
                    );
                    err.at(Stage::Migration(step.version().to_string()))
                })?;

            event!(
                Level::INFO,
                rid = %ctx.rid(),
                version = step.version(),
                indexes_created = report.indexes_created,
                records = report.records,
                "upgrade step done"
            );
            outcomes.push(StepOutcome {
                version: step.version().to_string(),
                name: step.name().to_string(),
                report,
            });
        }
        Ok(outcomes)
    }

    fn ordered(&self) -> Vec<&dyn UpgradeStep> {
        let mut steps: Vec<&dyn UpgradeStep> = self.steps.iter().map(|s| s.as_ref()).collect();
        steps.sort_by(|a, b| a.version().cmp(b.version()));
        steps
    }
}
