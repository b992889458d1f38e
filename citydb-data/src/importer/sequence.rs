//! Client-side identifier allocation.

use std::sync::atomic::{AtomicI64, Ordering};

use citydb_core::Table;
use rusqlite::Connection;

use super::ImportError;

/// One counter per table, seeded from the current maximum identifier.
///
/// Identifiers are known as soon as a row is buffered, so references can be
/// cached before the row reaches the database. Shared between sessions.
#[derive(Debug)]
pub struct IdSequences {
    counters: [AtomicI64; Table::COUNT],
}

impl IdSequences {
    /// Seed every counter from `MAX(id)` of its table.
    pub fn seed(connection: &Connection, schema: &str) -> Result<Self, ImportError> {
        let sequences = Self::starting_at(0);
        for table in Table::ALL {
            let max: i64 = connection
                .query_row(
                    &format!("SELECT COALESCE(MAX(id), 0) FROM {schema}.{table}"),
                    [],
                    |row| row.get(0),
                )
                .map_err(|source| ImportError::Sequence { table, source })?;
            sequences.counter(table).store(max, Ordering::Release);
        }
        Ok(sequences)
    }

    /// Counters that hand out `start + 1` next for every table.
    pub fn starting_at(start: i64) -> Self {
        Self {
            counters: std::array::from_fn(|_| AtomicI64::new(start)),
        }
    }

    /// Allocate the next identifier for `table`.
    pub fn next(&self, table: Table) -> i64 {
        self.counter(table).fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Last identifier handed out for `table`.
    pub fn current(&self, table: Table) -> i64 {
        self.counter(table).load(Ordering::Acquire)
    }

    fn counter(&self, table: Table) -> &AtomicI64 {
        &self.counters[table.index()]
    }
}
