//! A `Store` wrapper that counts calls and injects failures.
//!
//! Used to assert how many lookups an operation issues and how it behaves
//! when the store fails or stalls.

use super::{Filter, FindOptions, IndexSpec, Store};
use crate::core::{Record, Result, TopoError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Find,
    Count,
    CreateIndex,
    DropFields,
    Update,
}

#[derive(Default)]
struct Instruments {
    calls: HashMap<(StoreOp, String), usize>,
    failures: HashMap<(StoreOp, String), String>,
    delay: Option<Duration>,
}

pub struct InstrumentedStore<S> {
    inner: S,
    instruments: Mutex<Instruments>,
}

impl<S: Store> InstrumentedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            instruments: Mutex::new(Instruments::default()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Make every `op` against `collection` fail with a lookup error.
    pub fn fail_on(&self, op: StoreOp, collection: &str, reason: &str) {
        self.lock()
            .failures
            .insert((op, collection.to_string()), reason.to_string());
    }

    /// Sleep before every call.
    pub fn delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub fn calls(&self, op: StoreOp, collection: &str) -> usize {
        self.lock()
            .calls
            .get(&(op, collection.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Instruments> {
        // counters stay usable even if a test panicked mid-update
        self.instruments
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self, op: StoreOp, collection: &str) -> Result<()> {
        let (delay, failure) = {
            let mut guard = self.lock();
            *guard.calls.entry((op, collection.to_string())).or_insert(0) += 1;
            (
                guard.delay,
                guard.failures.get(&(op, collection.to_string())).cloned(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(reason) => Err(TopoError::lookup(collection, reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<S: Store> Store for InstrumentedStore<S> {
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        opts: &FindOptions,
    ) -> Result<Vec<Record>> {
        self.enter(StoreOp::Find, collection).await?;
        self.inner.find(collection, filter, opts).await
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.enter(StoreOp::Count, collection).await?;
        self.inner.count(collection, filter).await
    }

    async fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<()> {
        self.enter(StoreOp::CreateIndex, collection).await?;
        self.inner.create_index(collection, index).await
    }

    async fn drop_fields(
        &self,
        collection: &str,
        filter: &Filter,
        fields: &[String],
    ) -> Result<u64> {
        self.enter(StoreOp::DropFields, collection).await?;
        self.inner.drop_fields(collection, filter, fields).await
    }

    async fn update(&self, collection: &str, filter: &Filter, changes: &Record) -> Result<u64> {
        self.enter(StoreOp::Update, collection).await?;
        self.inner.update(collection, filter, changes).await
    }
}
