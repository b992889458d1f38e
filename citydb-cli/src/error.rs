//! Error types emitted by the citydb CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use citydb_core::ImportOptionsError;
use citydb_data::{AdapterError, ImportError, SchemaError};
use thiserror::Error;

/// Errors emitted by the citydb CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The merged import options were rejected.
    #[error("invalid import options: {source}")]
    InvalidOptions {
        #[source]
        source: ImportOptionsError,
    },
    /// The target database could not be opened.
    #[error("failed to open database {path:?}: {source}")]
    OpenDatabase {
        path: Utf8PathBuf,
        #[source]
        source: AdapterError,
    },
    /// Creating or checking the database schema failed.
    #[error("failed to prepare schema in {path:?}: {source}")]
    InitialiseSchema {
        path: Utf8PathBuf,
        #[source]
        source: SchemaError,
    },
    /// Opening the feature input failed.
    #[error("failed to open feature input at {path:?}: {source}")]
    OpenInput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A feature in the input stream could not be decoded.
    #[error("failed to parse feature {index} in {path:?}: {source}")]
    ParseFeature {
        path: Utf8PathBuf,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    /// The import job failed.
    #[error("import failed: {source}")]
    Import {
        #[source]
        source: ImportError,
    },
    /// Serializing the import summary failed.
    #[error("failed to serialize import summary: {0}")]
    SerialiseSummary(#[source] serde_json::Error),
    /// Writing the import summary failed.
    #[error("failed to write import summary: {0}")]
    WriteSummary(#[source] std::io::Error),
}

impl From<ImportError> for CliError {
    fn from(source: ImportError) -> Self {
        Self::Import { source }
    }
}
