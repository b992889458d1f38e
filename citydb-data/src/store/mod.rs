//! Disk-backed key-value maps used as overflow storage for reference
//! resolution.
//!
//! A [`MapStore`] owns a single temporary SQLite file. Each named map lives in
//! its own table and is created on first access. Closing the store drops the
//! connection and deletes the file; maps obtained earlier report
//! [`MapStoreError::Closed`] afterwards.

mod map;

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rusqlite::{Connection, Error as SqliteError, OptionalExtension};
use tempfile::TempPath;
use thiserror::Error;

pub use map::{MapChunks, MapType, PersistentMap};

/// Prefix of the backing file name.
const FILE_PREFIX: &str = "citydb-";
/// Suffix of the backing file name.
const FILE_SUFFIX: &str = ".cache";

/// Errors raised by the map store.
#[derive(Debug, Error)]
pub enum MapStoreError {
    /// The store directory could not be created.
    #[error("failed to create map store directory {path}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The backing file could not be created.
    #[error("failed to create map store file in {directory}")]
    CreateFile {
        /// Directory hosting the file.
        directory: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The backing file path is not valid UTF-8.
    #[error("map store file path is not valid UTF-8: {path}")]
    NonUtf8Path {
        /// Lossy rendering of the path.
        path: String,
    },
    /// The backing database could not be opened.
    #[error("failed to open map store at {path}")]
    Open {
        /// Backing file path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Applying a storage pragma failed.
    #[error("failed to configure map store pragma {pragma}")]
    Configure {
        /// Pragma being applied.
        pragma: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A map name contained characters other than ASCII letters, digits and
    /// underscores.
    #[error("invalid map name '{name}'")]
    InvalidMapName {
        /// Rejected name.
        name: String,
    },
    /// The store was closed.
    #[error("map store is closed")]
    Closed,
    /// A map operation failed.
    #[error("map store operation '{operation}' failed on map '{map}'")]
    Sqlite {
        /// Operation being executed.
        operation: &'static str,
        /// Map the operation targeted.
        map: String,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
}

/// Settings for [`MapStore::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapStoreOptions {
    /// Directory receiving the backing file. Created when missing.
    pub directory: Utf8PathBuf,
    /// Page cache size in KiB; SQLite's default applies when `None`.
    pub cache_size_kib: Option<u32>,
}

impl MapStoreOptions {
    /// Options rooted at `directory` with the default cache size.
    pub fn new(directory: impl Into<Utf8PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            cache_size_kib: None,
        }
    }
}

/// Shared state between the store and the maps it hands out. The connection
/// is declared first so it is dropped before the file is removed.
#[derive(Debug)]
struct StoreInner {
    connection: Mutex<Option<Connection>>,
    file: Mutex<Option<TempPath>>,
    path: Utf8PathBuf,
}

impl StoreInner {
    fn with_connection<T>(
        &self,
        map: &str,
        operation: &'static str,
        run: impl FnOnce(&mut Connection) -> Result<T, SqliteError>,
    ) -> Result<T, MapStoreError> {
        let mut guard = self.connection.lock();
        let connection = guard.as_mut().ok_or(MapStoreError::Closed)?;
        run(connection).map_err(|source| MapStoreError::Sqlite {
            operation,
            map: map.to_owned(),
            source,
        })
    }
}

/// Temporary, file-backed collection of named maps.
///
/// # Examples
/// ```
/// use camino::Utf8PathBuf;
/// use citydb_data::store::{MapStore, MapStoreOptions};
///
/// let scratch = tempfile::tempdir().expect("temp dir");
/// let dir = Utf8PathBuf::from_path_buf(scratch.path().to_path_buf()).expect("utf-8");
/// let store = MapStore::open(&MapStoreOptions::new(dir)).expect("open store");
/// let targets = store.get_or_create_map::<String, i64>("feature_t").expect("map");
/// targets.put(&"bldg-1".to_owned(), &42).expect("put");
/// assert_eq!(targets.get(&"bldg-1".to_owned()).expect("get"), Some(42));
/// store.close();
/// assert!(!store.path().exists());
/// ```
#[derive(Debug)]
pub struct MapStore {
    inner: Arc<StoreInner>,
}

impl MapStore {
    /// Create a fresh backing file below `options.directory`.
    pub fn open(options: &MapStoreOptions) -> Result<Self, MapStoreError> {
        citydb_fs::ensure_dir(&options.directory).map_err(|source| {
            MapStoreError::CreateDirectory {
                path: options.directory.clone(),
                source,
            }
        })?;
        let file = tempfile::Builder::new()
            .prefix(FILE_PREFIX)
            .suffix(FILE_SUFFIX)
            .tempfile_in(options.directory.as_std_path())
            .map_err(|source| MapStoreError::CreateFile {
                directory: options.directory.clone(),
                source,
            })?
            .into_temp_path();
        let path = Utf8PathBuf::from_path_buf(file.to_path_buf()).map_err(|path| {
            MapStoreError::NonUtf8Path {
                path: path.to_string_lossy().into_owned(),
            }
        })?;

        let connection =
            Connection::open(path.as_std_path()).map_err(|source| MapStoreError::Open {
                path: path.clone(),
                source,
            })?;
        configure(&connection, options.cache_size_kib)?;
        info!("created reference map store at {path}");

        Ok(Self {
            inner: Arc::new(StoreInner {
                connection: Mutex::new(Some(connection)),
                file: Mutex::new(Some(file)),
                path,
            }),
        })
    }

    /// Return the map called `name`, creating it on first access.
    pub fn get_or_create_map<K: MapType, V: MapType>(
        &self,
        name: &str,
    ) -> Result<PersistentMap<K, V>, MapStoreError> {
        let table = table_name(name)?;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                key {key} PRIMARY KEY NOT NULL,
                value {value} NOT NULL
            ) WITHOUT ROWID",
            key = K::SQL_TYPE,
            value = V::SQL_TYPE,
        );
        self.inner
            .with_connection(name, "create map", |connection| {
                connection.execute(&sql, []).map(|_| ())
            })?;
        debug!("opened persistent map {name}");
        Ok(PersistentMap::new(Arc::clone(&self.inner), name, table))
    }

    /// Whether a map called `name` exists. Never creates the map.
    pub fn has_map(&self, name: &str) -> Result<bool, MapStoreError> {
        let table = table_name(name)?;
        self.inner.with_connection(name, "lookup map", |connection| {
            connection
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [&table],
                    |_| Ok(()),
                )
                .optional()
                .map(|found| found.is_some())
        })
    }

    /// Drop every map and delete the backing file.
    ///
    /// Deletion errors are logged and otherwise ignored. Calling `close` more
    /// than once has no further effect.
    pub fn close(&self) {
        let connection = self.inner.connection.lock().take();
        let Some(connection) = connection else {
            return;
        };
        if let Err((_, err)) = connection.close() {
            warn!("failed to close map store connection: {err}");
        }
        if let Some(file) = self.inner.file.lock().take() {
            match file.close() {
                Ok(()) => info!("deleted reference map store at {}", self.inner.path),
                Err(err) => warn!(
                    "failed to delete reference map store at {}: {err}",
                    self.inner.path
                ),
            }
        }
    }

    /// Whether [`MapStore::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.inner.connection.lock().is_none()
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Utf8Path {
        &self.inner.path
    }
}

impl Drop for MapStore {
    fn drop(&mut self) {
        self.close();
    }
}

fn configure(connection: &Connection, cache_size_kib: Option<u32>) -> Result<(), MapStoreError> {
    // The store is scratch space; durability is not required.
    connection
        .pragma_update_and_check(None, "journal_mode", "OFF", |row| row.get::<_, String>(0))
        .map_err(|source| MapStoreError::Configure {
            pragma: "journal_mode",
            source,
        })?;
    connection
        .pragma_update(None, "synchronous", "OFF")
        .map_err(|source| MapStoreError::Configure {
            pragma: "synchronous",
            source,
        })?;
    if let Some(kib) = cache_size_kib {
        // Negative values are interpreted as KiB rather than pages.
        connection
            .pragma_update(None, "cache_size", -i64::from(kib))
            .map_err(|source| MapStoreError::Configure {
                pragma: "cache_size",
                source,
            })?;
    }
    Ok(())
}

fn table_name(name: &str) -> Result<String, MapStoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        Ok(format!("map_{name}"))
    } else {
        Err(MapStoreError::InvalidMapName {
            name: name.to_owned(),
        })
    }
}
