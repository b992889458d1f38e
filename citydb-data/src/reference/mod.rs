//! Reference caching and deferred resolution.
//!
//! - [`cache`] buffers targets and references per object kind.
//! - [`manager`] persists buffered entries and resolves them into foreign
//!   keys on a worker pool.
//! - [`tasks`] tracks the asynchronous work and its first failure.

pub mod cache;
pub mod manager;
pub mod tasks;

pub use cache::ReferenceCache;
pub use manager::{ReferenceError, ReferenceManager, ResolveSummary};
pub use tasks::{ReferenceTaskError, TaskGroup};
