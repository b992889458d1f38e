//! Task group tracking asynchronous reference work.
//!
//! Every spawned task bumps a pending counter that is released when the task
//! finishes, whether it succeeded, failed or panicked. [`TaskGroup::wait`]
//! blocks until the counter drains. The first failure is kept for the caller;
//! later ones are logged and dropped.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{error, warn};
use parking_lot::{Condvar, Mutex};
use rusqlite::Error as SqliteError;
use thiserror::Error;

use crate::adapter::AdapterError;
use crate::store::MapStoreError;

/// Failure recorded by an asynchronous reference task.
#[derive(Debug, Error)]
pub enum ReferenceTaskError {
    /// Writing cached entries to the map store failed.
    #[error("failed to persist {map} entries")]
    Persist {
        /// Target map name.
        map: String,
        /// Underlying store error.
        #[source]
        source: MapStoreError,
    },
    /// Reading entries from the map store failed.
    #[error("failed to read {map} entries")]
    Read {
        /// Source map name.
        map: String,
        /// Underlying store error.
        #[source]
        source: MapStoreError,
    },
    /// Opening a resolver connection failed.
    #[error("failed to connect for reference resolution")]
    Connect {
        /// Underlying adapter error.
        #[source]
        source: AdapterError,
    },
    /// Applying resolved references failed.
    #[error("failed to update {table}.{column}")]
    Update {
        /// Table being updated.
        table: &'static str,
        /// Foreign-key column being updated.
        column: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A task panicked.
    #[error("reference task panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

/// Wait group with a first-failure slot.
#[derive(Debug)]
pub struct TaskGroup {
    pending: Mutex<usize>,
    drained: Condvar,
    failure: Mutex<Option<ReferenceTaskError>>,
    should_run: AtomicBool,
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self {
            pending: Mutex::new(0),
            drained: Condvar::new(),
            failure: Mutex::new(None),
            should_run: AtomicBool::new(true),
        }
    }
}

impl TaskGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` on `pool`, tracking it until completion.
    pub fn spawn<F>(self: &Arc<Self>, pool: &rayon::ThreadPool, task: F)
    where
        F: FnOnce() -> Result<(), ReferenceTaskError> + Send + 'static,
    {
        *self.pending.lock() += 1;
        let group = Arc::clone(self);
        pool.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(task)).unwrap_or_else(|payload| {
                Err(ReferenceTaskError::Panicked {
                    message: panic_message(payload.as_ref()),
                })
            });
            if let Err(err) = outcome {
                group.record_failure(err);
            }
            group.finish_one();
        });
    }

    /// Block until every spawned task has finished.
    pub fn wait(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.drained.wait(&mut pending);
        }
    }

    /// Number of tasks still running or queued.
    pub fn pending(&self) -> usize {
        *self.pending.lock()
    }

    /// `false` once any task has failed.
    pub fn should_run(&self) -> bool {
        self.should_run.load(Ordering::Acquire)
    }

    /// Whether a failure has been recorded and not yet taken.
    pub fn has_failed(&self) -> bool {
        self.failure.lock().is_some()
    }

    /// Remove and return the first recorded failure.
    pub fn take_failure(&self) -> Option<ReferenceTaskError> {
        self.failure.lock().take()
    }

    fn record_failure(&self, err: ReferenceTaskError) {
        self.should_run.store(false, Ordering::Release);
        let mut slot = self.failure.lock();
        if slot.is_none() {
            error!("reference task failed: {err}");
            *slot = Some(err);
        } else {
            warn!("additional reference task failure: {err}");
        }
    }

    fn finish_one(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.drained.notify_all();
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_owned())
}
