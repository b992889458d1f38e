//! Import run orchestration.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use citydb_core::{ImportOptions, ReferenceBindings};
use log::info;
use serde::Serialize;

use super::{IdSequences, ImportError, ImportHelper};
use crate::adapter::DatabaseAdapter;
use crate::reference::{ReferenceError, ReferenceManager};

/// Totals reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Features written, including nested features.
    pub features: u64,
    /// Foreign keys filled in by reference resolution.
    pub resolved_references: u64,
    /// References dropped because their target never appeared.
    pub unresolved_references: u64,
}

/// One import run against a database.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
/// use citydb_core::{Feature, ImportOptions};
/// use citydb_data::{Importer, SqliteAdapter};
///
/// let adapter = Arc::new(SqliteAdapter::open("city.db".into()).expect("adapter"));
/// let importer = Importer::new(adapter, &ImportOptions::default()).expect("importer");
/// let mut session = importer.session().expect("session");
/// session.import_feature(&Feature::new("bldg:Building")).expect("import");
/// session.close().expect("flush");
/// let summary = importer.finish().expect("resolve references");
/// assert_eq!(summary.features, 1);
/// ```
#[derive(Debug)]
pub struct Importer {
    adapter: Arc<dyn DatabaseAdapter>,
    sequences: Arc<IdSequences>,
    references: Arc<ReferenceManager>,
    batch_size: usize,
    features: Arc<AtomicU64>,
}

impl Importer {
    /// Validate `options`, seed id sequences and start the reference
    /// manager.
    pub fn new(
        adapter: Arc<dyn DatabaseAdapter>,
        options: &ImportOptions,
    ) -> Result<Self, ImportError> {
        Self::with_bindings(adapter, Arc::new(ReferenceBindings::standard()), options)
    }

    /// Like [`Importer::new`] with an explicit binding table.
    pub fn with_bindings(
        adapter: Arc<dyn DatabaseAdapter>,
        bindings: Arc<ReferenceBindings>,
        options: &ImportOptions,
    ) -> Result<Self, ImportError> {
        options
            .validate()
            .map_err(|source| ImportError::Options { source })?;
        let connection = adapter
            .connect()
            .map_err(|source| ImportError::Connect { source })?;
        let sequences = IdSequences::seed(&connection, adapter.schema())?;
        drop(connection);
        let references = ReferenceManager::new(Arc::clone(&adapter), bindings, options)?;
        let batch_size = options.effective_batch_size(adapter.max_batch_size());
        Ok(Self {
            adapter,
            sequences: Arc::new(sequences),
            references: Arc::new(references),
            batch_size,
            features: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Open a session on a fresh writer connection.
    pub fn session(&self) -> Result<ImportHelper, ImportError> {
        if self.references.is_closed() {
            return Err(ImportError::References(ReferenceError::Closed));
        }
        let connection = self
            .adapter
            .connect()
            .map_err(|source| ImportError::Connect { source })?;
        Ok(ImportHelper::new(
            connection,
            self.adapter.schema(),
            Arc::clone(&self.sequences),
            Arc::clone(&self.references),
            self.batch_size,
            Arc::clone(&self.features),
        ))
    }

    /// Rows buffered per importer before a cascading flush.
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Reference manager shared by all sessions.
    pub fn references(&self) -> &ReferenceManager {
        &self.references
    }

    /// Resolve references and shut the reference manager down.
    ///
    /// Close every session first; rows still buffered in a session are not
    /// part of the resolution.
    pub fn finish(self) -> Result<ImportSummary, ImportError> {
        let resolved = self.references.resolve_references();
        let closed = self.references.close();
        resolved?;
        let references = closed?;
        let summary = ImportSummary {
            features: self.features.load(Ordering::Acquire),
            resolved_references: references.resolved,
            unresolved_references: references.unresolved,
        };
        info!(
            "imported {} feature(s); {} reference(s) resolved, {} unresolved",
            summary.features, summary.resolved_references, summary.unresolved_references
        );
        Ok(summary)
    }
}
