use crate::config::TopoConfig;
use crate::core::ids::collect_i64;
use crate::core::{RequestContext, Result, Stage, TopoError};
use crate::cursor::{CursorMode, PageCursor};
use crate::storage::{Filter, IndexSpec, Store};
use serde::Serialize;
use std::sync::Mutex;
use tracing::{Level, event};

/// Outcome of an idempotent index creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Created,
    AlreadyExists,
}

/// Work done by one migration step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub indexes_created: usize,
    pub indexes_existing: usize,
    /// Non-empty pages processed by batched field removal.
    pub pages: usize,
    /// Records selected across those pages.
    pub records: usize,
    /// `find` calls, including the terminating empty page.
    pub fetches: usize,
}

impl MigrationReport {
    pub fn record_index(&mut self, outcome: IndexOutcome) {
        match outcome {
            IndexOutcome::Created => self.indexes_created += 1,
            IndexOutcome::AlreadyExists => self.indexes_existing += 1,
        }
    }

    pub fn merge(&mut self, other: &MigrationReport) {
        self.indexes_created += other.indexes_created;
        self.indexes_existing += other.indexes_existing;
        self.pages += other.pages;
        self.records += other.records;
        self.fetches += other.fetches;
    }
}

/// Create `index` on `collection`, treating "already exists" as success.
pub async fn ensure_index(
    store: &dyn Store,
    ctx: &RequestContext,
    config: &TopoConfig,
    collection: &str,
    index: &IndexSpec,
) -> Result<IndexOutcome> {
    match ctx
        .run_within(config.fetch_timeout, store.create_index(collection, index))
        .await
    {
        Ok(()) => {
            event!(Level::INFO, rid = %ctx.rid(), collection, index = %index.name, "index created");
            Ok(IndexOutcome::Created)
        }
        Err(err) if err.is_duplicate_index() => {
            event!(Level::DEBUG, rid = %ctx.rid(), collection, index = %index.name, "index already exists");
            Ok(IndexOutcome::AlreadyExists)
        }
        Err(err) => {
            event!(
                Level::ERROR,
                rid = %ctx.rid(),
                collection,
                index = ?index,
                error = %err,
                "create index failed"
            );
            Err(err)
        }
    }
}

/// Remove `field` from every document of `collection` that has it.
///
/// Pages of `config.page_step` ids are selected with a shrinking cursor
/// (the filter is "field exists", which each drop narrows) and the field
/// is dropped from exactly those ids. A failure stops the run; pages
/// already processed stay migrated, and re-running picks up the rest.
pub async fn drop_field_where_exists(
    store: &dyn Store,
    ctx: &RequestContext,
    config: &TopoConfig,
    collection: &str,
    id_field: &str,
    field: &str,
) -> Result<MigrationReport> {
    let fields = [field.to_string()];
    let fields = &fields;
    // ids of the last page whose drop touched nothing
    let stalled: Mutex<Option<Vec<i64>>> = Mutex::new(None);
    let stalled = &stalled;

    let cursor_report = PageCursor::new(store, ctx, collection, Filter::exists(field))
        .mode(CursorMode::Shrinking)
        .fields([id_field])
        .step(config.page_step)
        .stage(Stage::MigrationPage)
        .fetch_timeout(config.fetch_timeout)
        .for_each_page(|page| async move {
            let ids = collect_i64(&page, id_field).inspect_err(|err| {
                event!(Level::ERROR, rid = %ctx.rid(), collection, error = %err, "record id invalid");
            })?;

            let scope = Filter::in_ids(id_field, &ids);
            let touched = ctx
                .run_within(config.fetch_timeout, store.drop_fields(collection, &scope, fields))
                .await
                .map_err(|err| {
                    event!(Level::ERROR, rid = %ctx.rid(), collection, field, error = %err, "drop column failed");
                    err.at(Stage::MigrationMutate)
                })?;

            // a concurrent drop also touches nothing; only a repeat page is a stall
            let mut last_stalled = stalled.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if touched == 0 {
                if last_stalled.as_ref() == Some(&ids) {
                    event!(Level::ERROR, rid = %ctx.rid(), collection, field, selected = ids.len(), "drop column made no progress");
                    return Err(TopoError::lookup(
                        collection,
                        format!("dropping '{}' matched none of {} selected records", field, ids.len()),
                    )
                    .at(Stage::MigrationMutate));
                }
                event!(Level::WARN, rid = %ctx.rid(), collection, field, selected = ids.len(), "drop column touched nothing, re-reading");
                *last_stalled = Some(ids);
                return Ok(());
            }
            *last_stalled = None;

            event!(Level::DEBUG, rid = %ctx.rid(), collection, field, touched, "column dropped");
            Ok(())
        })
        .await?;

    Ok(MigrationReport {
        pages: cursor_report.pages,
        records: cursor_report.records,
        fetches: cursor_report.fetches,
        ..Default::default()
    })
}
