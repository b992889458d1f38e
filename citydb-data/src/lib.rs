//! Persistence and reference resolution for the citydb import engine.
//!
//! Responsibilities:
//! - Open database connections and create the citydb schema.
//! - Buffer feature rows per table and flush them in foreign-key order.
//! - Defer references to objects not yet written and resolve them once the
//!   run completes, using a disk-backed map store as overflow space.
//!
//! Boundaries:
//! - Domain types and the binding table live in `citydb-core`.
//! - Format readers are out of scope; features arrive already parsed.
//!
//! Invariants:
//! - Parent tables are flushed no later than the tables referencing them.
//! - Asynchronous failures surface once, from `ReferenceManager::close`.
#![forbid(unsafe_code)]

pub mod adapter;
pub mod importer;
pub mod reference;
pub mod schema;
pub mod store;

pub use adapter::{AdapterError, DatabaseAdapter, SqliteAdapter};
pub use importer::{
    DatabaseImporter, IdSequences, ImportError, ImportHelper, ImportSummary, Importer,
    ImporterKind, TableHelper,
};
pub use reference::{
    ReferenceCache, ReferenceError, ReferenceManager, ReferenceTaskError, ResolveSummary,
    TaskGroup,
};
pub use schema::{SCHEMA_VERSION, SchemaError, initialise_schema};
