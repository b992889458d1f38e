//! Typed views over a single table of the map store.

use std::marker::PhantomData;
use std::sync::Arc;

use rusqlite::types::{FromSql, ToSql};
use rusqlite::{OptionalExtension, params};

use super::{MapStoreError, StoreInner};

/// Key or value type storable in a [`PersistentMap`].
pub trait MapType: ToSql + FromSql + Clone + Send + Sync + 'static {
    /// SQLite column affinity used for the type.
    const SQL_TYPE: &'static str;
}

impl MapType for i64 {
    const SQL_TYPE: &'static str = "INTEGER";
}

impl MapType for String {
    const SQL_TYPE: &'static str = "TEXT";
}

/// Ordered, disk-backed map from `K` to `V`.
///
/// Handles are cheap to clone and may be used from several threads; access
/// is serialised through the owning store's connection.
#[derive(Debug)]
pub struct PersistentMap<K, V> {
    inner: Arc<StoreInner>,
    name: String,
    table: String,
    marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V> Clone for PersistentMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            name: self.name.clone(),
            table: self.table.clone(),
            marker: PhantomData,
        }
    }
}

impl<K: MapType, V: MapType> PersistentMap<K, V> {
    pub(super) fn new(inner: Arc<StoreInner>, name: &str, table: String) -> Self {
        Self {
            inner,
            name: name.to_owned(),
            table,
            marker: PhantomData,
        }
    }

    /// Map name as passed to [`super::MapStore::get_or_create_map`].
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert or replace one entry.
    pub fn put(&self, key: &K, value: &V) -> Result<(), MapStoreError> {
        let sql = self.upsert_sql();
        self.inner.with_connection(&self.name, "put", |connection| {
            connection
                .prepare_cached(&sql)?
                .execute(params![key, value])
                .map(|_| ())
        })
    }

    /// Insert or replace many entries in one transaction. Later entries for
    /// the same key win.
    pub fn put_all<'a, I>(&self, entries: I) -> Result<usize, MapStoreError>
    where
        I: IntoIterator<Item = (&'a K, &'a V)>,
    {
        let sql = self.upsert_sql();
        self.inner.with_connection(&self.name, "put all", |connection| {
            let transaction = connection.transaction()?;
            let mut written = 0_usize;
            {
                let mut statement = transaction.prepare_cached(&sql)?;
                for (key, value) in entries {
                    statement.execute(params![key, value])?;
                    written += 1;
                }
            }
            transaction.commit()?;
            Ok(written)
        })
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &K) -> Result<Option<V>, MapStoreError> {
        let sql = self.select_sql();
        self.inner.with_connection(&self.name, "get", |connection| {
            connection
                .prepare_cached(&sql)?
                .query_row([key], |row| row.get(0))
                .optional()
        })
    }

    /// Values stored under each of `keys`, in the same order.
    pub fn get_all<'a, I>(&self, keys: I) -> Result<Vec<Option<V>>, MapStoreError>
    where
        I: IntoIterator<Item = &'a K>,
    {
        let sql = self.select_sql();
        self.inner.with_connection(&self.name, "get all", |connection| {
            let mut statement = connection.prepare_cached(&sql)?;
            keys.into_iter()
                .map(|key| statement.query_row([key], |row| row.get(0)).optional())
                .collect()
        })
    }

    /// Remove `key`, returning whether an entry existed.
    pub fn remove(&self, key: &K) -> Result<bool, MapStoreError> {
        let sql = format!("DELETE FROM {} WHERE key = ?1", self.table);
        self.inner.with_connection(&self.name, "remove", |connection| {
            connection
                .prepare_cached(&sql)?
                .execute([key])
                .map(|deleted| deleted > 0)
        })
    }

    /// Number of entries.
    pub fn len(&self) -> Result<usize, MapStoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        let count: i64 = self.inner.with_connection(&self.name, "count", |connection| {
            connection.query_row(&sql, [], |row| row.get(0))
        })?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> Result<bool, MapStoreError> {
        self.len().map(|len| len == 0)
    }

    /// Up to `limit` entries with keys strictly greater than `after`, in key
    /// order. `None` starts from the smallest key.
    pub fn entries_after(
        &self,
        after: Option<&K>,
        limit: usize,
    ) -> Result<Vec<(K, V)>, MapStoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = match after {
            Some(_) => format!(
                "SELECT key, value FROM {} WHERE key > ?1 ORDER BY key LIMIT ?2",
                self.table
            ),
            None => format!("SELECT key, value FROM {} ORDER BY key LIMIT ?1", self.table),
        };
        self.inner.with_connection(&self.name, "iterate", |connection| {
            let mut statement = connection.prepare_cached(&sql)?;
            let rows = match after {
                Some(key) => statement.query(params![key, limit])?,
                None => statement.query(params![limit])?,
            };
            rows.mapped(|row| Ok((row.get(0)?, row.get(1)?)))
                .collect()
        })
    }

    /// Iterate over all entries in key order, `chunk_size` entries at a time.
    ///
    /// Each chunk is read under a fresh lock so writers on other maps are not
    /// starved while a large map is traversed.
    pub fn chunks(&self, chunk_size: usize) -> MapChunks<K, V> {
        MapChunks {
            map: self.clone(),
            chunk_size: chunk_size.max(1),
            cursor: None,
            done: false,
        }
    }

    fn upsert_sql(&self) -> String {
        format!(
            "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
            self.table
        )
    }

    fn select_sql(&self) -> String {
        format!("SELECT value FROM {} WHERE key = ?1", self.table)
    }
}

/// Iterator returned by [`PersistentMap::chunks`].
#[derive(Debug)]
pub struct MapChunks<K, V> {
    map: PersistentMap<K, V>,
    chunk_size: usize,
    cursor: Option<K>,
    done: bool,
}

impl<K: MapType, V: MapType> Iterator for MapChunks<K, V> {
    type Item = Result<Vec<(K, V)>, MapStoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.map.entries_after(self.cursor.as_ref(), self.chunk_size) {
            Ok(chunk) if chunk.is_empty() => {
                self.done = true;
                None
            }
            Ok(chunk) => {
                if chunk.len() < self.chunk_size {
                    self.done = true;
                }
                self.cursor = chunk.last().map(|(key, _)| key.clone());
                Some(Ok(chunk))
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
