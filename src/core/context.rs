//! Per-request context: request id, deadline and cancellation.
//!
//! Every store call made on behalf of a request goes through
//! [`RequestContext::run`], so a cancelled or expired request stops at the
//! in-flight fetch and never issues the next one.

use super::{Result, TopoError};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestContext {
    rid: String,
    deadline: Option<Instant>,
    cancel: watch::Receiver<bool>,
}

/// Cancels every [`RequestContext`] cloned from the one it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl RequestContext {
    /// A context with a fresh request id, no deadline, and no way to cancel.
    pub fn new() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            rid: Uuid::new_v4().simple().to_string(),
            deadline: None,
            cancel: rx,
        }
    }

    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            rid: Uuid::new_v4().simple().to_string(),
            deadline: None,
            cancel: rx,
        };
        (ctx, CancelHandle { tx })
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A timeout too large to represent leaves the context without a
    /// deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    pub fn rid(&self) -> &str {
        &self.rid
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Fails if the request is already cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(TopoError::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(TopoError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Runs `fut` bounded by this context.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.run_within(None, fut).await
    }

    /// Runs `fut` bounded by this context and, when given, an extra
    /// per-call limit. The earlier of the two deadlines wins.
    pub async fn run_within<T, F>(&self, limit: Option<Duration>, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let call_deadline = limit.and_then(|l| Instant::now().checked_add(l));
        let deadline = match (self.deadline, call_deadline) {
            (Some(d), Some(c)) => Some(d.min(c)),
            (d, c) => d.or(c),
        };

        let mut cancel = self.cancel.clone();
        let cancelled = async move {
            loop {
                if *cancel.borrow_and_update() {
                    return;
                }
                if cancel.changed().await.is_err() {
                    // sender gone, nobody can cancel any more
                    std::future::pending::<()>().await;
                }
            }
        };

        match deadline {
            Some(deadline) => tokio::select! {
                res = tokio::time::timeout_at(deadline, fut) => {
                    res.map_err(|_| TopoError::DeadlineExceeded)?
                }
                _ = cancelled => Err(TopoError::Cancelled),
            },
            None => tokio::select! {
                res = fut => res,
                _ = cancelled => Err(TopoError::Cancelled),
            },
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
