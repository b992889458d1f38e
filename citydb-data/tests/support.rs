//! Shared helpers for citydb-data integration tests.
#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::sync::Arc;

use camino::Utf8PathBuf;
use citydb_core::ImportOptions;
use citydb_data::{DatabaseAdapter, SqliteAdapter, initialise_schema};
use rusqlite::{Connection, OptionalExtension};
use tempfile::TempDir;

/// Scratch directory holding a database and the map store directory.
pub struct Workspace {
    _dir: TempDir,
    pub root: Utf8PathBuf,
    pub adapter: Arc<SqliteAdapter>,
}

impl Workspace {
    /// Create a database with the citydb schema.
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap_or_else(|err| panic!("create temp dir: {err}"));
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .unwrap_or_else(|path| panic!("non UTF-8 temp dir {path:?}"));
        let adapter = Arc::new(
            SqliteAdapter::open(root.join("city.db"))
                .unwrap_or_else(|err| panic!("open adapter: {err}")),
        );
        let mut connection = adapter
            .connect()
            .unwrap_or_else(|err| panic!("connect: {err}"));
        initialise_schema(&mut connection).unwrap_or_else(|err| panic!("create schema: {err}"));
        Self {
            _dir: dir,
            root,
            adapter,
        }
    }

    /// Same scratch layout without the schema.
    pub fn without_schema() -> Self {
        let dir = TempDir::new().unwrap_or_else(|err| panic!("create temp dir: {err}"));
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
            .unwrap_or_else(|path| panic!("non UTF-8 temp dir {path:?}"));
        let adapter = Arc::new(
            SqliteAdapter::open(root.join("empty.db"))
                .unwrap_or_else(|err| panic!("open adapter: {err}")),
        );
        Self {
            _dir: dir,
            root,
            adapter,
        }
    }

    /// Options rooting the map store inside the workspace.
    pub fn options(&self) -> ImportOptions {
        ImportOptions::default()
            .with_temp_dir(self.root.join("cache"))
            .with_threads(2)
    }

    /// Adapter as a trait object.
    pub fn dyn_adapter(&self) -> Arc<dyn DatabaseAdapter> {
        Arc::clone(&self.adapter) as Arc<dyn DatabaseAdapter>
    }

    /// Fresh connection for assertions.
    pub fn connection(&self) -> Connection {
        self.adapter
            .connect()
            .unwrap_or_else(|err| panic!("connect: {err}"))
    }

    /// Number of map store files left in the cache directory.
    pub fn cache_files(&self) -> usize {
        match std::fs::read_dir(self.root.join("cache")) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

/// Insert a bare feature row.
pub fn seed_feature(connection: &Connection, id: i64, object_id: &str) {
    connection
        .execute(
            "INSERT INTO feature (id, objectid, feature_type) VALUES (?1, ?2, 'bldg:Building')",
            (id, object_id),
        )
        .unwrap_or_else(|err| panic!("seed feature {id}: {err}"));
}

/// Insert a property row awaiting a feature reference.
pub fn seed_reference_property(connection: &Connection, id: i64, feature_id: i64) {
    connection
        .execute(
            "INSERT INTO property (id, feature_id, name, datatype, val_relation_type)
             VALUES (?1, ?2, 'relatedTo', 'FeatureProperty', 0)",
            (id, feature_id),
        )
        .unwrap_or_else(|err| panic!("seed property {id}: {err}"));
}

/// Read an integer column of one row.
pub fn read_column(connection: &Connection, table: &str, column: &str, id: i64) -> Option<i64> {
    connection
        .query_row(
            &format!("SELECT {column} FROM {table} WHERE id = ?1"),
            [id],
            |row| row.get::<_, Option<i64>>(0),
        )
        .optional()
        .unwrap_or_else(|err| panic!("read {table}.{column} of {id}: {err}"))
        .flatten()
}

/// Count rows of `table`.
pub fn count_rows(connection: &Connection, table: &str) -> i64 {
    connection
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap_or_else(|err| panic!("count {table}: {err}"))
}

/// Identifier of the feature row carrying `object_id`.
pub fn feature_id(connection: &Connection, object_id: &str) -> i64 {
    connection
        .query_row(
            "SELECT id FROM feature WHERE objectid = ?1",
            [object_id],
            |row| row.get(0),
        )
        .unwrap_or_else(|err| panic!("find feature {object_id}: {err}"))
}
