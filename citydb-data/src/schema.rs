//! DDL for the 3D City Database tables written by the importer family.

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

/// Version recorded in `citydb_schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Errors raised when initialising the database schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Enabling SQLite foreign keys failed.
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A migration step failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Step being executed.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was created by an incompatible schema version.
    #[error(
        "expected citydb schema version {expected} but found {found}; apply migrations before retrying"
    )]
    VersionMismatch {
        /// Version this build writes.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}

/// Create the citydb tables, indexes and version marker if missing.
///
/// Existing installations must already match [`SCHEMA_VERSION`].
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use citydb_data::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create schema");
/// initialise_schema(&mut conn).expect("schema creation is repeatable");
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| SchemaError::ForeignKeys { source })?;

    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_feature_tables(&transaction)?;
    create_appearance_tables(&transaction)?;
    create_property_table(&transaction)?;
    create_indexes(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_feature_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create feature",
        "CREATE TABLE IF NOT EXISTS feature (
            id INTEGER PRIMARY KEY,
            objectid TEXT,
            identifier TEXT,
            identifier_codespace TEXT,
            feature_type TEXT NOT NULL,
            envelope TEXT,
            creation_date TEXT,
            termination_date TEXT,
            lineage TEXT
        )",
    )?;
    run_migration_step(
        transaction,
        "create geometry_data",
        "CREATE TABLE IF NOT EXISTS geometry_data (
            id INTEGER PRIMARY KEY,
            geometry TEXT,
            implicit_geometry TEXT,
            feature_id INTEGER REFERENCES feature(id) ON DELETE CASCADE
        )",
    )?;
    run_migration_step(
        transaction,
        "create implicit_geometry",
        "CREATE TABLE IF NOT EXISTS implicit_geometry (
            id INTEGER PRIMARY KEY,
            objectid TEXT,
            mime_type TEXT,
            reference_to_library TEXT,
            relative_geometry_id INTEGER REFERENCES geometry_data(id) ON DELETE CASCADE
        )",
    )?;
    run_migration_step(
        transaction,
        "create address",
        "CREATE TABLE IF NOT EXISTS address (
            id INTEGER PRIMARY KEY,
            objectid TEXT,
            identifier TEXT,
            street TEXT,
            house_number TEXT,
            po_box TEXT,
            zip_code TEXT,
            city TEXT,
            state TEXT,
            country TEXT,
            free_text TEXT,
            multi_point TEXT
        )",
    )
}

fn create_appearance_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create tex_image",
        "CREATE TABLE IF NOT EXISTS tex_image (
            id INTEGER PRIMARY KEY,
            image_uri TEXT NOT NULL,
            mime_type TEXT
        )",
    )?;
    run_migration_step(
        transaction,
        "create appearance",
        "CREATE TABLE IF NOT EXISTS appearance (
            id INTEGER PRIMARY KEY,
            objectid TEXT,
            identifier TEXT,
            theme TEXT,
            is_global INTEGER NOT NULL DEFAULT 0,
            feature_id INTEGER REFERENCES feature(id) ON DELETE CASCADE,
            implicit_geometry_id INTEGER REFERENCES implicit_geometry(id) ON DELETE CASCADE
        )",
    )?;
    run_migration_step(
        transaction,
        "create surface_data",
        "CREATE TABLE IF NOT EXISTS surface_data (
            id INTEGER PRIMARY KEY,
            objectid TEXT,
            identifier TEXT,
            is_front INTEGER NOT NULL DEFAULT 1,
            surface_data_type TEXT NOT NULL,
            x3d_diffuse_color TEXT,
            x3d_transparency REAL,
            tex_image_id INTEGER REFERENCES tex_image(id) ON DELETE SET NULL,
            tex_texture_type TEXT,
            tex_wrap_mode TEXT
        )",
    )?;
    run_migration_step(
        transaction,
        "create appear_to_surface_data",
        "CREATE TABLE IF NOT EXISTS appear_to_surface_data (
            id INTEGER PRIMARY KEY,
            surface_data_id INTEGER REFERENCES surface_data(id) ON DELETE CASCADE,
            appearance_id INTEGER NOT NULL REFERENCES appearance(id) ON DELETE CASCADE
        )",
    )
}

fn create_property_table(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create property",
        "CREATE TABLE IF NOT EXISTS property (
            id INTEGER PRIMARY KEY,
            feature_id INTEGER NOT NULL REFERENCES feature(id) ON DELETE CASCADE,
            parent_id INTEGER REFERENCES property(id) ON DELETE CASCADE,
            namespace TEXT,
            name TEXT NOT NULL,
            datatype TEXT NOT NULL,
            val_int INTEGER,
            val_double REAL,
            val_string TEXT,
            val_timestamp TEXT,
            val_uri TEXT,
            val_codespace TEXT,
            val_uom TEXT,
            val_array TEXT,
            val_lod TEXT,
            val_geometry_id INTEGER REFERENCES geometry_data(id) ON DELETE CASCADE,
            val_implicitgeom_id INTEGER REFERENCES implicit_geometry(id) ON DELETE SET NULL,
            val_implicitgeom_refpoint TEXT,
            val_appearance_id INTEGER REFERENCES appearance(id) ON DELETE CASCADE,
            val_address_id INTEGER REFERENCES address(id) ON DELETE SET NULL,
            val_feature_id INTEGER REFERENCES feature(id) ON DELETE SET NULL,
            val_relation_type INTEGER,
            val_content TEXT
        )",
    )
}

fn create_indexes(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "index feature objectid",
        "CREATE INDEX IF NOT EXISTS idx_feature_objectid ON feature(objectid)",
    )?;
    run_migration_step(
        transaction,
        "index property feature",
        "CREATE INDEX IF NOT EXISTS idx_property_feature ON property(feature_id, parent_id)",
    )?;
    run_migration_step(
        transaction,
        "index property references",
        "CREATE INDEX IF NOT EXISTS idx_property_val_feature ON property(val_feature_id)",
    )?;
    run_migration_step(
        transaction,
        "index tex_image uri",
        "CREATE INDEX IF NOT EXISTS idx_tex_image_uri ON tex_image(image_uri)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS citydb_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM citydb_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO citydb_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}
