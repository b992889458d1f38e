//! Deferred reference resolution backed by the map store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use citydb_core::{ImportOptions, ImportOptionsError, ReferenceBinding, ReferenceBindings};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rusqlite::{Error as SqliteError, TransactionBehavior, params};
use serde::Serialize;
use thiserror::Error;

use super::cache::ReferenceCache;
use super::tasks::{ReferenceTaskError, TaskGroup};
use crate::adapter::DatabaseAdapter;
use crate::store::{MapStore, MapStoreError, MapStoreOptions, PersistentMap};

/// Errors raised by the [`ReferenceManager`].
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// The import options were rejected.
    #[error("invalid reference manager options")]
    Options {
        /// Validation failure.
        #[source]
        source: ImportOptionsError,
    },
    /// The map store could not be created.
    #[error("reference cache unavailable")]
    CacheUnavailable {
        /// Underlying store error.
        #[source]
        source: MapStoreError,
    },
    /// The worker pool could not be started.
    #[error("failed to start reference worker pool")]
    BuildPool {
        /// Source error returned by `rayon`.
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
    /// A synchronous map store operation failed.
    #[error("reference map store operation failed")]
    Store {
        /// Underlying store error.
        #[source]
        source: MapStoreError,
    },
    /// The manager was already closed.
    #[error("reference manager is closed")]
    Closed,
    /// An asynchronous task failed; only the first failure is reported.
    #[error("failed to resolve references")]
    Resolve {
        /// First recorded task failure.
        #[source]
        source: ReferenceTaskError,
    },
    /// Strict mode found references without a target.
    #[error("{count} reference(s) could not be resolved")]
    UnresolvedReferences {
        /// Number of dropped references.
        count: u64,
    },
}

/// Outcome of reference resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveSummary {
    /// Foreign keys written.
    pub resolved: u64,
    /// References dropped because no target exists.
    pub unresolved: u64,
}

/// Persists reference caches and resolves them into foreign keys.
///
/// All methods take `&self`; share the manager through an [`Arc`] between
/// import sessions. Work runs on a private thread pool and is tracked by a
/// [`TaskGroup`]. Asynchronous failures surface from
/// [`ReferenceManager::close`].
#[derive(Debug)]
pub struct ReferenceManager {
    bindings: Arc<ReferenceBindings>,
    adapter: Arc<dyn DatabaseAdapter>,
    store: MapStore,
    pool: Mutex<Option<rayon::ThreadPool>>,
    tasks: Arc<TaskGroup>,
    batch_size: usize,
    strict: bool,
    resolved: Arc<AtomicU64>,
    unresolved: AtomicU64,
    closed: AtomicBool,
}

impl ReferenceManager {
    /// Open the map store and start the worker pool.
    ///
    /// The store lives below `options.temp_dir` (default
    /// `<system temp>/citydb`). Failing to create it yields
    /// [`ReferenceError::CacheUnavailable`].
    pub fn new(
        adapter: Arc<dyn DatabaseAdapter>,
        bindings: Arc<ReferenceBindings>,
        options: &ImportOptions,
    ) -> Result<Self, ReferenceError> {
        options
            .validate()
            .map_err(|source| ReferenceError::Options { source })?;
        let directory = options
            .temp_dir_or_default()
            .map_err(|source| ReferenceError::Options { source })?;
        let store = MapStore::open(&MapStoreOptions {
            directory,
            cache_size_kib: options.cache_size_kib,
        })
        .map_err(|source| ReferenceError::CacheUnavailable { source })?;

        let threads = options.worker_threads(num_cpus::get());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("citydb-references-{index}"))
            .build()
            .map_err(|source| ReferenceError::BuildPool { source })?;
        let batch_size = options.resolution_batch_size(adapter.max_batch_size());
        debug!("reference manager started with {threads} worker(s), batch size {batch_size}");

        Ok(Self {
            bindings,
            adapter,
            store,
            pool: Mutex::new(Some(pool)),
            tasks: Arc::new(TaskGroup::new()),
            batch_size,
            strict: options.strict_references,
            resolved: Arc::new(AtomicU64::new(0)),
            unresolved: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Schedule persistence of everything buffered in `cache` and clear it.
    ///
    /// Targets go to the `{kind}_t` map and references to the `{kind}_r`
    /// map. The cache is emptied even when scheduling fails.
    pub fn store_references(&self, cache: &mut ReferenceCache) -> Result<(), ReferenceError> {
        let targets = cache.take_targets();
        let references = cache.take_references();
        cache.clear();

        if self.is_closed() {
            return Err(ReferenceError::Closed);
        }
        let Some(binding) = self.bindings.get(cache.kind()) else {
            warn!("no reference binding for {}; dropping cache", cache.kind());
            return Ok(());
        };

        if !targets.is_empty() {
            let map = self.map::<String, i64>(&binding.target_map_name())?;
            self.spawn(move || persist(&map, &targets))?;
        }
        if !references.is_empty() {
            let map = self.map::<i64, String>(&binding.reference_map_name())?;
            self.spawn(move || persist(&map, &references))?;
        }
        Ok(())
    }

    /// Match every stored reference against the stored targets and schedule
    /// the resulting foreign-key updates.
    ///
    /// Waits for pending persistence first. Update tasks are dispatched
    /// without waiting; [`ReferenceManager::close`] is the join point.
    /// References without a target are counted and dropped.
    pub fn resolve_references(&self) -> Result<(), ReferenceError> {
        if self.is_closed() {
            return Err(ReferenceError::Closed);
        }
        self.tasks.wait();

        for binding in self.bindings.iter() {
            if !self.tasks.should_run() {
                break;
            }
            self.resolve_binding(binding)?;
        }
        Ok(())
    }

    /// Wait for outstanding work, stop the pool and delete the map store.
    ///
    /// Returns the first asynchronous failure as
    /// [`ReferenceError::Resolve`]. In strict mode, any unresolved reference
    /// yields [`ReferenceError::UnresolvedReferences`]. Repeated calls return
    /// the summary without reporting again.
    pub fn close(&self) -> Result<ResolveSummary, ReferenceError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(self.summary());
        }
        self.tasks.wait();
        drop(self.pool.lock().take());
        self.store.close();

        if let Some(source) = self.tasks.take_failure() {
            return Err(ReferenceError::Resolve { source });
        }
        let summary = self.summary();
        info!(
            "reference resolution finished: {} resolved, {} unresolved",
            summary.resolved, summary.unresolved
        );
        if self.strict && summary.unresolved > 0 {
            return Err(ReferenceError::UnresolvedReferences {
                count: summary.unresolved,
            });
        }
        Ok(summary)
    }

    /// Whether [`ReferenceManager::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Counters accumulated so far.
    pub fn summary(&self) -> ResolveSummary {
        ResolveSummary {
            resolved: self.resolved.load(Ordering::Acquire),
            unresolved: self.unresolved.load(Ordering::Acquire),
        }
    }

    /// Pairs applied per update task.
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn resolve_binding(&self, binding: &ReferenceBinding) -> Result<(), ReferenceError> {
        let reference_name = binding.reference_map_name();
        if !self.has_map(&reference_name)? {
            return Ok(());
        }
        let references = self.map::<i64, String>(&reference_name)?;
        let target_name = binding.target_map_name();
        if !self.has_map(&target_name)? {
            let orphaned = references
                .len()
                .map_err(|source| ReferenceError::Store { source })?;
            self.count_unresolved(binding, orphaned);
            return Ok(());
        }
        let targets = self.map::<String, i64>(&target_name)?;

        let mut batch: Vec<(i64, i64)> = Vec::with_capacity(self.batch_size);
        let mut dispatched = 0_usize;
        let mut missing = 0_usize;
        for chunk in references.chunks(self.batch_size) {
            if !self.tasks.should_run() {
                debug!("stopping {} resolution after a task failure", binding.label());
                break;
            }
            let chunk = chunk.map_err(|source| ReferenceError::Store { source })?;
            let found = targets
                .get_all(chunk.iter().map(|(_, object_id)| object_id))
                .map_err(|source| ReferenceError::Store { source })?;
            for ((row_id, _), target_id) in chunk.into_iter().zip(found) {
                let Some(target_id) = target_id else {
                    missing += 1;
                    continue;
                };
                batch.push((row_id, target_id));
                if batch.len() >= self.batch_size {
                    dispatched += batch.len();
                    self.dispatch_updates(binding, std::mem::take(&mut batch))?;
                }
            }
        }
        if !batch.is_empty() {
            dispatched += batch.len();
            self.dispatch_updates(binding, batch)?;
        }

        info!(
            "scheduled {dispatched} {} reference update(s) on {}.{}",
            binding.label(),
            binding.table(),
            binding.column()
        );
        self.count_unresolved(binding, missing);
        Ok(())
    }

    fn dispatch_updates(
        &self,
        binding: &ReferenceBinding,
        pairs: Vec<(i64, i64)>,
    ) -> Result<(), ReferenceError> {
        let update = UpdateTask {
            adapter: Arc::clone(&self.adapter),
            sql: format!(
                "UPDATE {}.{} SET {} = ?1 WHERE id = ?2",
                self.adapter.schema(),
                binding.table(),
                binding.column()
            ),
            table: binding.table().as_str(),
            column: binding.column(),
            resolved: Arc::clone(&self.resolved),
        };
        self.spawn(move || update.apply(&pairs))
    }

    fn count_unresolved(&self, binding: &ReferenceBinding, count: usize) {
        if count == 0 {
            return;
        }
        let count = u64::try_from(count).unwrap_or(u64::MAX);
        self.unresolved.fetch_add(count, Ordering::AcqRel);
        info!("{count} {} reference(s) have no target and were skipped", binding.label());
    }

    fn spawn<F>(&self, task: F) -> Result<(), ReferenceError>
    where
        F: FnOnce() -> Result<(), ReferenceTaskError> + Send + 'static,
    {
        let pool = self.pool.lock();
        let pool = pool.as_ref().ok_or(ReferenceError::Closed)?;
        self.tasks.spawn(pool, task);
        Ok(())
    }

    fn map<K, V>(&self, name: &str) -> Result<PersistentMap<K, V>, ReferenceError>
    where
        K: crate::store::MapType,
        V: crate::store::MapType,
    {
        self.store
            .get_or_create_map(name)
            .map_err(|source| ReferenceError::Store { source })
    }

    fn has_map(&self, name: &str) -> Result<bool, ReferenceError> {
        self.store
            .has_map(name)
            .map_err(|source| ReferenceError::Store { source })
    }
}

impl Drop for ReferenceManager {
    fn drop(&mut self) {
        if self.is_closed() {
            return;
        }
        if let Err(err) = self.close() {
            warn!("reference manager dropped with error: {err}");
        }
    }
}

fn persist<K, V>(
    map: &PersistentMap<K, V>,
    entries: &std::collections::HashMap<K, V>,
) -> Result<(), ReferenceTaskError>
where
    K: crate::store::MapType,
    V: crate::store::MapType,
{
    let written = map
        .put_all(entries.iter())
        .map_err(|source| ReferenceTaskError::Persist {
            map: map.name().to_owned(),
            source,
        })?;
    debug!("persisted {written} entries to {}", map.name());
    Ok(())
}

/// One batch of foreign-key updates executed on its own connection.
struct UpdateTask {
    adapter: Arc<dyn DatabaseAdapter>,
    sql: String,
    table: &'static str,
    column: &'static str,
    resolved: Arc<AtomicU64>,
}

impl UpdateTask {
    fn apply(&self, pairs: &[(i64, i64)]) -> Result<(), ReferenceTaskError> {
        let mut connection = self
            .adapter
            .connect()
            .map_err(|source| ReferenceTaskError::Connect { source })?;
        let failed = |source: SqliteError| ReferenceTaskError::Update {
            table: self.table,
            column: self.column,
            source,
        };
        // Take the write lock up front so concurrent tasks wait on the busy
        // timeout instead of failing on lock upgrade.
        let transaction = connection
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(failed)?;
        let mut updated = 0_usize;
        {
            let mut statement = transaction.prepare_cached(&self.sql).map_err(failed)?;
            for (row_id, target_id) in pairs {
                updated += statement
                    .execute(params![target_id, row_id])
                    .map_err(failed)?;
            }
        }
        transaction.commit().map_err(failed)?;
        self.resolved.fetch_add(
            u64::try_from(updated).unwrap_or(u64::MAX),
            Ordering::AcqRel,
        );
        Ok(())
    }
}
