//! Importer registry and commit ordering.

use std::collections::BTreeMap;

use citydb_core::Table;
use rusqlite::Connection;

use super::{DatabaseImporter, ImportError, ImporterKind};

/// Lazily created importers of one session, keyed by kind.
#[derive(Debug)]
pub struct TableHelper {
    schema: String,
    importers: BTreeMap<ImporterKind, DatabaseImporter>,
}

impl TableHelper {
    /// Create an empty registry writing to `schema`.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            importers: BTreeMap::new(),
        }
    }

    /// Return the importer for `kind`, preparing it on first use.
    pub fn get_or_create_importer(
        &mut self,
        kind: ImporterKind,
        connection: &Connection,
    ) -> Result<&mut DatabaseImporter, ImportError> {
        match self.importers.entry(kind) {
            std::collections::btree_map::Entry::Occupied(entry) => Ok(entry.into_mut()),
            std::collections::btree_map::Entry::Vacant(entry) => {
                let importer = DatabaseImporter::new(kind, &self.schema, connection)?;
                Ok(entry.insert(importer))
            }
        }
    }

    /// Tables flushed together with `table`: its transitive foreign-key
    /// parents first, `table` last.
    ///
    /// # Examples
    /// ```
    /// use citydb_core::Table;
    /// use citydb_data::TableHelper;
    ///
    /// let order = TableHelper::commit_order(Table::ImplicitGeometry);
    /// assert_eq!(
    ///     order,
    ///     vec![Table::Feature, Table::GeometryData, Table::ImplicitGeometry]
    /// );
    /// ```
    pub fn commit_order(table: Table) -> Vec<Table> {
        let mut order = Vec::with_capacity(Table::COUNT);
        visit(table, &mut order);
        order
    }

    /// Every table, parents before children.
    pub fn global_commit_order() -> Vec<Table> {
        let mut order = Vec::with_capacity(Table::COUNT);
        for table in Table::ALL {
            visit(table, &mut order);
        }
        order
    }

    /// Live importers writing `table`, in kind order.
    pub fn importers(&self, table: Table) -> impl Iterator<Item = &DatabaseImporter> {
        self.importers
            .values()
            .filter(move |importer| importer.table() == table)
    }

    /// Execute every importer of `table`, returning the rows written.
    pub fn execute_table(
        &mut self,
        table: Table,
        connection: &Connection,
    ) -> Result<usize, ImportError> {
        let mut written = 0;
        for importer in self
            .importers
            .values_mut()
            .filter(|importer| importer.table() == table)
        {
            written += importer.execute_batch(connection)?;
        }
        Ok(written)
    }

    /// Rows buffered across all importers.
    pub fn pending(&self) -> usize {
        self.importers.values().map(DatabaseImporter::pending).sum()
    }
}

fn visit(table: Table, order: &mut Vec<Table>) {
    if order.contains(&table) {
        return;
    }
    for parent in table.dependencies() {
        visit(*parent, order);
    }
    order.push(table);
}
