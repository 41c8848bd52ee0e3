use std::time::Duration;

/// Page size used by batched migrations.
pub const DEFAULT_PAGE_STEP: usize = 5000;

/// Largest `page.limit` a host listing accepts.
pub const DEFAULT_MAX_PAGE_LIMIT: usize = 500;

/// Sentinel `page.limit` meaning "no limit"; always accepted.
pub const NO_LIMIT: usize = 999_999_999;

/// Topology service and migration configuration
#[derive(Debug, Clone)]
pub struct TopoConfig {
    /// Records fetched per page by the batched cursor
    pub page_step: usize,

    /// Upper bound for caller-supplied page limits
    pub max_page_limit: usize,

    /// Bound applied to each individual store call, on top of the
    /// request's own deadline
    pub fetch_timeout: Option<Duration>,
}

impl TopoConfig {
    pub fn new() -> Self {
        Self {
            page_step: DEFAULT_PAGE_STEP,
            max_page_limit: DEFAULT_MAX_PAGE_LIMIT,
            fetch_timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Set the batched cursor page size
    pub fn page_step(mut self, step: usize) -> Self {
        self.page_step = step.max(1);
        self
    }

    /// Set the page limit ceiling
    pub fn max_page_limit(mut self, max: usize) -> Self {
        self.max_page_limit = max;
        self
    }

    /// Set the per-call fetch timeout
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Disable the per-call fetch timeout
    pub fn no_fetch_timeout(mut self) -> Self {
        self.fetch_timeout = None;
        self
    }
}

impl Default for TopoConfig {
    fn default() -> Self {
        Self::new()
    }
}
