mod availability;
mod conflict;
mod durable;
mod error;
mod mutations;
mod queries;
mod store;

pub use availability::{free_units, resolve, unit_schedules, AllocationPolicy};
pub use durable::WalStore;
pub use error::EngineError;
pub use store::{MemoryStore, ReservationIndex, ReservationStore};

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use crate::catalog::FleetCatalog;
use crate::config::Config;

/// Serialization point for one category: held across resolve and append.
pub type CategoryLock = Arc<Mutex<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub policy: AllocationPolicy,
    /// Longest wait for a category's commit lock before giving up with `StoreBusy`.
    pub lock_timeout: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            policy: AllocationPolicy::FirstFit,
            lock_timeout: Duration::from_secs(5),
        }
    }
}

/// Books units from a fixed fleet against an injected reservation store.
pub struct Engine {
    catalog: Arc<FleetCatalog>,
    store: Arc<dyn ReservationStore>,
    options: EngineOptions,
    category_locks: DashMap<String, CategoryLock>,
}

impl Engine {
    pub fn new(
        catalog: Arc<FleetCatalog>,
        store: Arc<dyn ReservationStore>,
        options: EngineOptions,
    ) -> Self {
        Self {
            catalog,
            store,
            options,
            category_locks: DashMap::new(),
        }
    }

    /// Engine over the WAL store and fleet described by `config`.
    /// Must be called inside a tokio runtime.
    pub fn open(config: &Config) -> io::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let catalog = config.load_catalog()?;
        let store = WalStore::open(&config.wal_path())?;
        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(store),
            EngineOptions {
                policy: config.policy,
                lock_timeout: config.lock_timeout,
            },
        ))
    }

    pub fn catalog(&self) -> &FleetCatalog {
        &self.catalog
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub(super) fn category_lock(&self, category: &str) -> CategoryLock {
        if let Some(lock) = self.category_locks.get(category) {
            return lock.value().clone();
        }
        self.category_locks
            .entry(category.to_string())
            .or_default()
            .value()
            .clone()
    }

    /// Acquire the category's commit lock, waiting at most `lock_timeout`.
    pub(super) async fn lock_category(
        &self,
        category: &str,
    ) -> Result<OwnedMutexGuard<()>, EngineError> {
        let lock = self.category_lock(category);
        let wait_start = Instant::now();
        let acquired = tokio::time::timeout(self.options.lock_timeout, lock.lock_owned()).await;
        metrics::histogram!(crate::observability::LOCK_WAIT_SECONDS)
            .record(wait_start.elapsed().as_secs_f64());
        match acquired {
            Ok(guard) => Ok(guard),
            Err(_) => {
                metrics::counter!(crate::observability::LOCK_TIMEOUTS_TOTAL).increment(1);
                warn!(category, "commit lock not acquired within {:?}", self.options.lock_timeout);
                Err(EngineError::StoreBusy(self.options.lock_timeout))
            }
        }
    }
}
