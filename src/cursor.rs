//! Batched cursor over an unbounded collection.
//!
//! In [`CursorMode::Shrinking`] every page is fetched from offset 0: the
//! caller's step is expected to remove the page from the filter's match
//! set (drop the tested field, delete the rows), so advancing the offset
//! would skip records. [`CursorMode::Advancing`] is for read-only scans
//! where the match set does not change between pages.
//!
//! Either way the cursor stops only on an empty page. A short page is not
//! a terminal signal.

use crate::config::DEFAULT_PAGE_STEP;
use crate::core::{Record, RequestContext, Result, Stage};
use crate::storage::{Filter, FindOptions, Store};
use std::future::Future;
use std::time::Duration;
use tracing::{Level, event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    Shrinking,
    Advancing,
}

/// What a completed `for_each_page` run saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorReport {
    /// Non-empty pages handed to the step.
    pub pages: usize,
    /// Records across those pages.
    pub records: usize,
    /// `find` calls issued, including the final empty one.
    pub fetches: usize,
}

pub struct PageCursor<'a> {
    store: &'a dyn Store,
    ctx: &'a RequestContext,
    collection: String,
    filter: Filter,
    fields: Vec<String>,
    sort: Option<String>,
    step: usize,
    mode: CursorMode,
    stage: Stage,
    fetch_timeout: Option<Duration>,
    offset: usize,
    fetches: usize,
    exhausted: bool,
}

impl<'a> PageCursor<'a> {
    pub fn new(
        store: &'a dyn Store,
        ctx: &'a RequestContext,
        collection: impl Into<String>,
        filter: Filter,
    ) -> Self {
        Self {
            store,
            ctx,
            collection: collection.into(),
            filter,
            fields: Vec::new(),
            sort: None,
            step: DEFAULT_PAGE_STEP,
            mode: CursorMode::Shrinking,
            stage: Stage::MigrationPage,
            fetch_timeout: None,
            offset: 0,
            fetches: 0,
            exhausted: false,
        }
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    pub fn mode(mut self, mode: CursorMode) -> Self {
        self.mode = mode;
        self
    }

    /// Stage reported when a fetch fails.
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stage = stage;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetches(&self) -> usize {
        self.fetches
    }

    /// Fetch the next page, or `None` once a fetch comes back empty.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Record>>> {
        if self.exhausted {
            return Ok(None);
        }

        let mut opts = FindOptions::new()
            .fields(self.fields.iter().cloned())
            .start(self.offset)
            .limit(self.step);
        if let Some(sort) = &self.sort {
            opts = opts.sort(sort.clone());
        }

        self.fetches += 1;
        let page = self
            .ctx
            .run_within(
                self.fetch_timeout,
                self.store.find(&self.collection, &self.filter, &opts),
            )
            .await
            .map_err(|err| {
                event!(
                    Level::ERROR,
                    rid = %self.ctx.rid(),
                    collection = %self.collection,
                    offset = self.offset,
                    error = %err,
                    "batched page fetch failed"
                );
                err.at(self.stage.clone())
            })?;

        if page.is_empty() {
            self.exhausted = true;
            return Ok(None);
        }

        event!(
            Level::DEBUG,
            rid = %self.ctx.rid(),
            collection = %self.collection,
            offset = self.offset,
            len = page.len(),
            "batched page fetched"
        );

        if self.mode == CursorMode::Advancing {
            self.offset += page.len();
        }
        Ok(Some(page))
    }

    /// Drive the cursor to exhaustion, handing each page to `step`.
    ///
    /// Errors from `step` are returned as-is; work done on earlier pages
    /// is not undone.
    pub async fn for_each_page<F, Fut>(mut self, mut step: F) -> Result<CursorReport>
    where
        F: FnMut(Vec<Record>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut report = CursorReport::default();
        while let Some(page) = self.next_page().await? {
            report.pages += 1;
            report.records += page.len();
            step(page).await?;
        }
        report.fetches = self.fetches;
        Ok(report)
    }
}
