//! Database adapters handing out writer and resolver connections.

use std::fmt;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use rusqlite::{Connection, Error as SqliteError};
use thiserror::Error;

/// Default lock wait applied to every connection.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest batch the SQLite adapter accepts per flush.
pub const SQLITE_MAX_BATCH_SIZE: usize = 10_000;

/// Prepared statements kept per connection.
const STATEMENT_CACHE_CAPACITY: usize = 32;

/// Errors raised while opening database connections.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The directory holding the database could not be created.
    #[error("failed to create database directory for {path}")]
    CreateDirectory {
        /// Database path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the database failed.
    #[error("failed to open database at {path}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Applying connection settings failed.
    #[error("failed to configure database connection: {setting}")]
    Configure {
        /// Setting being applied.
        setting: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Source of database connections for the importer and the reference
/// manager.
///
/// Implementations must be safe to share across worker threads: every call to
/// [`DatabaseAdapter::connect`] yields a fresh connection owned by the caller.
pub trait DatabaseAdapter: Send + Sync + fmt::Debug {
    /// Open a new connection.
    fn connect(&self) -> Result<Connection, AdapterError>;

    /// Schema qualifying every table name.
    fn schema(&self) -> &str {
        "main"
    }

    /// Largest number of rows the database accepts per batch.
    fn max_batch_size(&self) -> usize;
}

/// [`DatabaseAdapter`] over an on-disk SQLite database.
///
/// # Examples
/// ```no_run
/// use citydb_data::{DatabaseAdapter, SqliteAdapter};
///
/// let adapter = SqliteAdapter::open("out/city.db".into()).expect("open adapter");
/// let connection = adapter.connect().expect("connect");
/// # drop(connection);
/// ```
#[derive(Debug, Clone)]
pub struct SqliteAdapter {
    path: Utf8PathBuf,
    busy_timeout: Duration,
    max_batch_size: usize,
}

impl SqliteAdapter {
    /// Create an adapter for `path`, creating its parent directory.
    pub fn open(path: Utf8PathBuf) -> Result<Self, AdapterError> {
        citydb_fs::ensure_parent_dir(&path).map_err(|source| AdapterError::CreateDirectory {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            max_batch_size: SQLITE_MAX_BATCH_SIZE,
        })
    }

    /// Override the lock wait.
    #[must_use]
    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    /// Override the batch ceiling.
    #[must_use]
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Database path.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl DatabaseAdapter for SqliteAdapter {
    fn connect(&self) -> Result<Connection, AdapterError> {
        let connection =
            Connection::open(self.path.as_std_path()).map_err(|source| AdapterError::Open {
                path: self.path.clone(),
                source,
            })?;
        connection
            .busy_timeout(self.busy_timeout)
            .map_err(|source| AdapterError::Configure {
                setting: "busy_timeout",
                source,
            })?;
        connection
            .pragma_update(None, "foreign_keys", true)
            .map_err(|source| AdapterError::Configure {
                setting: "foreign_keys",
                source,
            })?;
        connection.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        Ok(connection)
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}
