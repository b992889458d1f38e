//! Options controlling an import run.

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Default number of rows buffered per importer before a cascading flush.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Upper bound on the number of `UPDATE` pairs issued per resolution task.
pub const MAX_RESOLUTION_BATCH_SIZE: usize = 1000;

/// Name of the directory created below the system temp directory when no
/// explicit temp directory is configured.
pub const DEFAULT_TEMP_DIR_NAME: &str = "citydb";

/// Errors returned by [`ImportOptions::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportOptionsError {
    /// The batch size was zero.
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
    /// The worker thread count was zero.
    #[error("thread count must be greater than zero")]
    ZeroThreads,
    /// The system temp directory is not valid UTF-8.
    #[error("system temp directory is not valid UTF-8: {path}")]
    NonUtf8TempDir {
        /// Lossy rendering of the offending path.
        path: String,
    },
}

/// Tunables for an import run.
///
/// # Examples
/// ```
/// use citydb_core::ImportOptions;
///
/// let options = ImportOptions::default().with_batch_size(50).with_threads(4);
/// assert_eq!(options.effective_batch_size(20), 20);
/// assert_eq!(options.resolution_batch_size(10_000), 50);
/// assert_eq!(options.worker_threads(16), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Rows buffered per importer before a cascading flush.
    pub batch_size: usize,
    /// Worker threads used by the reference manager.
    pub threads: Option<usize>,
    /// Directory hosting the reference map store.
    pub temp_dir: Option<Utf8PathBuf>,
    /// Page cache size of the map store in KiB.
    pub cache_size_kib: Option<u32>,
    /// Fail the run when references remain unresolved.
    pub strict_references: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            threads: None,
            temp_dir: None,
            cache_size_kib: None,
            strict_references: false,
        }
    }
}

impl ImportOptions {
    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the worker thread count.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Set the map store directory.
    #[must_use]
    pub fn with_temp_dir(mut self, temp_dir: impl AsRef<Utf8Path>) -> Self {
        self.temp_dir = Some(temp_dir.as_ref().to_path_buf());
        self
    }

    /// Set the map store page cache size.
    #[must_use]
    pub fn with_cache_size_kib(mut self, cache_size_kib: u32) -> Self {
        self.cache_size_kib = Some(cache_size_kib);
        self
    }

    /// Enable or disable strict reference checking.
    #[must_use]
    pub fn with_strict_references(mut self, strict: bool) -> Self {
        self.strict_references = strict;
        self
    }

    /// Reject option combinations that cannot drive an import.
    pub fn validate(&self) -> Result<(), ImportOptionsError> {
        if self.batch_size == 0 {
            return Err(ImportOptionsError::ZeroBatchSize);
        }
        if self.threads == Some(0) {
            return Err(ImportOptionsError::ZeroThreads);
        }
        Ok(())
    }

    /// Batch size bounded by the database limit.
    pub fn effective_batch_size(&self, database_max: usize) -> usize {
        self.batch_size.min(database_max).max(1)
    }

    /// Number of resolved pairs applied per `UPDATE` task.
    pub fn resolution_batch_size(&self, database_max: usize) -> usize {
        MAX_RESOLUTION_BATCH_SIZE.min(self.effective_batch_size(database_max))
    }

    /// Worker thread count, defaulting to `max(2, available)`.
    pub fn worker_threads(&self, available: usize) -> usize {
        self.threads.unwrap_or_else(|| available.max(2))
    }

    /// Directory hosting the map store, defaulting to `<system temp>/citydb`.
    pub fn temp_dir_or_default(&self) -> Result<Utf8PathBuf, ImportOptionsError> {
        if let Some(dir) = &self.temp_dir {
            return Ok(dir.clone());
        }
        let system = std::env::temp_dir();
        let system = Utf8PathBuf::from_path_buf(system).map_err(|path| {
            ImportOptionsError::NonUtf8TempDir {
                path: path.to_string_lossy().into_owned(),
            }
        })?;
        Ok(system.join(DEFAULT_TEMP_DIR_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_are_valid() {
        let options = ImportOptions::default();
        assert_eq!(options.batch_size, DEFAULT_BATCH_SIZE);
        assert!(!options.strict_references);
        assert!(options.validate().is_ok());
    }

    #[rstest]
    #[case(ImportOptions::default().with_batch_size(0), ImportOptionsError::ZeroBatchSize)]
    #[case(ImportOptions::default().with_threads(0), ImportOptionsError::ZeroThreads)]
    fn rejects_zero_values(#[case] options: ImportOptions, #[case] expected: ImportOptionsError) {
        assert_eq!(options.validate(), Err(expected));
    }

    #[rstest]
    #[case(1000, 10_000, 1000, 1000)]
    #[case(5000, 2000, 2000, 1000)]
    #[case(200, 10_000, 200, 200)]
    fn batch_sizes_follow_database_limit(
        #[case] configured: usize,
        #[case] database_max: usize,
        #[case] effective: usize,
        #[case] resolution: usize,
    ) {
        let options = ImportOptions::default().with_batch_size(configured);
        assert_eq!(options.effective_batch_size(database_max), effective);
        assert_eq!(options.resolution_batch_size(database_max), resolution);
    }

    #[rstest]
    #[case(None, 1, 2)]
    #[case(None, 8, 8)]
    #[case(Some(3), 8, 3)]
    fn worker_threads_default_to_available_with_floor(
        #[case] threads: Option<usize>,
        #[case] available: usize,
        #[case] expected: usize,
    ) {
        let options = ImportOptions {
            threads,
            ..ImportOptions::default()
        };
        assert_eq!(options.worker_threads(available), expected);
    }

    #[rstest]
    fn explicit_temp_dir_wins() {
        let options = ImportOptions::default().with_temp_dir("/var/cache/import");
        let dir = options.temp_dir_or_default().expect("temp dir");
        assert_eq!(dir, Utf8PathBuf::from("/var/cache/import"));
    }

    #[rstest]
    fn default_temp_dir_is_below_system_temp() {
        let dir = ImportOptions::default()
            .temp_dir_or_default()
            .expect("utf-8 temp dir");
        assert_eq!(dir.file_name(), Some(DEFAULT_TEMP_DIR_NAME));
    }
}
