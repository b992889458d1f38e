//! One import session bound to a single writer connection.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use citydb_core::{ObjectKind, Reference, Table};
use log::debug;
use rusqlite::Connection;
use rusqlite::types::Value;
use serde::Serialize;

use super::{IdSequences, ImportError, ImporterKind, TableHelper};
use crate::reference::{ReferenceCache, ReferenceManager};

/// Per-session import state.
///
/// A session buffers rows per importer kind. When any importer reaches the
/// batch size, the importer's table and all of its foreign-key parents are
/// flushed in one transaction, after which every non-empty reference cache is
/// handed to the [`ReferenceManager`]. Sessions are not shared between
/// threads; run one session per writer connection.
#[derive(Debug)]
pub struct ImportHelper {
    connection: Connection,
    tables: TableHelper,
    sequences: Arc<IdSequences>,
    caches: BTreeMap<ObjectKind, ReferenceCache>,
    references: Arc<ReferenceManager>,
    batch_size: usize,
    textures: HashMap<String, i64>,
    features: Arc<AtomicU64>,
}

impl ImportHelper {
    pub(super) fn new(
        connection: Connection,
        schema: &str,
        sequences: Arc<IdSequences>,
        references: Arc<ReferenceManager>,
        batch_size: usize,
        features: Arc<AtomicU64>,
    ) -> Self {
        Self {
            connection,
            tables: TableHelper::new(schema),
            sequences,
            caches: BTreeMap::new(),
            references,
            batch_size: batch_size.max(1),
            textures: HashMap::new(),
            features,
        }
    }

    /// Rows buffered per importer before a cascading flush.
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Rows buffered across all importers.
    pub fn pending(&self) -> usize {
        self.tables.pending()
    }

    /// Rows buffered by the importer of `kind`.
    pub fn pending_for(&self, kind: ImporterKind) -> usize {
        self.tables
            .importers(kind.table())
            .filter(|importer| importer.kind() == kind)
            .map(super::DatabaseImporter::pending)
            .sum()
    }

    /// Buffered reference cache for `kind`, if any entry was recorded.
    pub fn cache(&self, kind: ObjectKind) -> Option<&ReferenceCache> {
        self.caches.get(&kind)
    }

    /// Buffer `row` for `kind`, flushing when the batch size is reached.
    pub fn add_batch(&mut self, kind: ImporterKind, row: Vec<Value>) -> Result<(), ImportError> {
        let importer = self.tables.get_or_create_importer(kind, &self.connection)?;
        let pending = importer.add_batch(row)?;
        if pending >= self.batch_size {
            debug!("{kind} reached {pending} pending row(s); flushing");
            self.execute_batch(kind.table())?;
        }
        Ok(())
    }

    /// Flush `table` together with its foreign-key parents.
    pub fn execute_batch(&mut self, table: Table) -> Result<(), ImportError> {
        self.commit(&TableHelper::commit_order(table))
    }

    /// Flush every table.
    pub fn flush(&mut self) -> Result<(), ImportError> {
        self.commit(&TableHelper::global_commit_order())
    }

    /// Flush every table and release prepared statements.
    pub fn close(mut self) -> Result<(), ImportError> {
        self.flush()?;
        self.connection.flush_prepared_statement_cache();
        Ok(())
    }

    /// Record that `object_id` was stored as row `id`.
    pub fn cache_target(&mut self, kind: ObjectKind, object_id: Option<&str>, id: i64) {
        self.cache_mut(kind).put_target(object_id, id);
    }

    /// Record that row `id` refers to `reference`.
    pub fn cache_reference(&mut self, kind: ObjectKind, reference: Option<&Reference>, id: i64) {
        self.cache_mut(kind).put_reference(reference, id);
    }

    pub(super) fn next_id(&self, table: Table) -> i64 {
        self.sequences.next(table)
    }

    pub(super) fn count_feature(&self) {
        self.features.fetch_add(1, Ordering::AcqRel);
    }

    /// Identifier of the texture image already written for `uri` in this
    /// session.
    pub(super) fn texture_image(&self, uri: &str) -> Option<i64> {
        self.textures.get(uri).copied()
    }

    pub(super) fn remember_texture_image(&mut self, uri: &str, id: i64) {
        self.textures.insert(uri.to_owned(), id);
    }

    fn cache_mut(&mut self, kind: ObjectKind) -> &mut ReferenceCache {
        self.caches
            .entry(kind)
            .or_insert_with(|| ReferenceCache::new(kind))
    }

    fn commit(&mut self, order: &[Table]) -> Result<(), ImportError> {
        let Self {
            connection,
            tables,
            caches,
            references,
            ..
        } = self;
        let transaction =
            connection
                .unchecked_transaction()
                .map_err(|source| ImportError::Transaction {
                    operation: "begin",
                    source,
                })?;
        let mut written = 0;
        for table in order {
            written += tables.execute_table(*table, &transaction)?;
        }
        transaction
            .commit()
            .map_err(|source| ImportError::Transaction {
                operation: "commit",
                source,
            })?;
        if written > 0 {
            debug!("committed {written} row(s) across {} table(s)", order.len());
        }

        for cache in caches.values_mut().filter(|cache| !cache.is_empty()) {
            references.store_references(cache)?;
        }
        Ok(())
    }
}

/// Encode `value` as JSON text for a column of `table`.
pub(super) fn json_column<T: Serialize + ?Sized>(
    table: Table,
    column: &'static str,
    value: &T,
) -> Result<Value, ImportError> {
    serde_json::to_string(value)
        .map(Value::Text)
        .map_err(|source| ImportError::Encode {
            table,
            column,
            source,
        })
}

/// Optional text column.
pub(super) fn text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_owned()))
}

/// Optional integer column.
pub(super) fn integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}
