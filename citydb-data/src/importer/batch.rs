//! Row buffer for a single importer kind.

use citydb_core::Table;
use rusqlite::types::Value;
use rusqlite::{Connection, params_from_iter};

use super::{ImportError, ImporterKind};

/// Buffers rows for one [`ImporterKind`] until the owning session flushes.
///
/// The `INSERT` statement is prepared on construction so that schema
/// problems abort the run before any row is written. Execution reuses the
/// connection's statement cache.
#[derive(Debug)]
pub struct DatabaseImporter {
    kind: ImporterKind,
    sql: String,
    rows: Vec<Vec<Value>>,
}

impl DatabaseImporter {
    /// Prepare the importer's statement on `connection`.
    pub fn new(
        kind: ImporterKind,
        schema: &str,
        connection: &Connection,
    ) -> Result<Self, ImportError> {
        let sql = kind.insert_sql(schema);
        connection
            .prepare_cached(&sql)
            .map_err(|source| ImportError::PrepareInsert { kind, source })?;
        Ok(Self {
            kind,
            sql,
            rows: Vec::new(),
        })
    }

    /// Importer kind.
    pub const fn kind(&self) -> ImporterKind {
        self.kind
    }

    /// Table receiving the rows.
    pub const fn table(&self) -> Table {
        self.kind.table()
    }

    /// Rows buffered since the last execution.
    pub fn pending(&self) -> usize {
        self.rows.len()
    }

    /// Buffer `row` and return the number of pending rows.
    pub fn add_batch(&mut self, row: Vec<Value>) -> Result<usize, ImportError> {
        let expected = self.kind.columns().len();
        if row.len() != expected {
            return Err(ImportError::RowShape {
                kind: self.kind,
                expected,
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(self.rows.len())
    }

    /// Insert every buffered row and reset the buffer. Returns the number of
    /// rows written; does nothing when the buffer is empty.
    pub fn execute_batch(&mut self, connection: &Connection) -> Result<usize, ImportError> {
        if self.rows.is_empty() {
            return Ok(0);
        }
        let rows = std::mem::take(&mut self.rows);
        let kind = self.kind;
        let mut statement = connection
            .prepare_cached(&self.sql)
            .map_err(|source| ImportError::PrepareInsert { kind, source })?;
        for row in &rows {
            statement
                .execute(params_from_iter(row.iter()))
                .map_err(|source| ImportError::Execute { kind, source })?;
        }
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialise_schema;
    use rstest::{fixture, rstest};

    #[fixture]
    fn connection() -> Connection {
        let mut connection = Connection::open_in_memory().expect("in-memory database");
        initialise_schema(&mut connection).expect("create schema");
        connection
    }

    fn texture_row(id: i64) -> Vec<Value> {
        vec![
            Value::Integer(id),
            Value::Text(format!("tex/{id}.png")),
            Value::Null,
        ]
    }

    #[rstest]
    fn execute_batch_is_a_no_op_when_empty(connection: Connection) {
        let mut importer =
            DatabaseImporter::new(ImporterKind::TextureImage, "main", &connection).expect("new");
        assert_eq!(importer.execute_batch(&connection).expect("execute"), 0);
    }

    #[rstest]
    fn execute_batch_writes_rows_and_resets_counter(connection: Connection) {
        let mut importer =
            DatabaseImporter::new(ImporterKind::TextureImage, "main", &connection).expect("new");
        assert_eq!(importer.add_batch(texture_row(1)).expect("add"), 1);
        assert_eq!(importer.add_batch(texture_row(2)).expect("add"), 2);
        assert_eq!(importer.execute_batch(&connection).expect("execute"), 2);
        assert_eq!(importer.pending(), 0);
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM tex_image", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 2);
    }

    #[rstest]
    fn rejects_rows_with_the_wrong_shape(connection: Connection) {
        let mut importer =
            DatabaseImporter::new(ImporterKind::TextureImage, "main", &connection).expect("new");
        let err = importer
            .add_batch(vec![Value::Integer(1)])
            .expect_err("short row");
        assert!(matches!(
            err,
            ImportError::RowShape {
                expected: 3,
                found: 1,
                ..
            }
        ));
    }

    #[rstest]
    fn construction_fails_without_schema() {
        let connection = Connection::open_in_memory().expect("in-memory database");
        let err = DatabaseImporter::new(ImporterKind::Feature, "main", &connection)
            .expect_err("missing table");
        assert!(matches!(
            err,
            ImportError::PrepareInsert {
                kind: ImporterKind::Feature,
                ..
            }
        ));
    }
}
