//! Import command implementation for the citydb CLI.

use std::io::{BufReader, Write};
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::File;
use citydb_core::{Feature, ImportOptions};
use citydb_data::{DatabaseAdapter, ImportSummary, Importer, SqliteAdapter, initialise_schema};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BATCH_SIZE, ARG_CACHE_SIZE_KIB, ARG_DATABASE, ARG_INPUT, ARG_STRICT_REFERENCES,
    ARG_TEMP_DIR, ARG_THREADS, CliError, ENV_DATABASE, ENV_INPUT,
};

/// CLI arguments for the `import` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Import a stream of JSON-encoded features (JSON Lines or \
                 concatenated JSON) into a SQLite 3D City Database. \
                 References between features, addresses, implicit \
                 geometries and surface data are resolved after all \
                 features are written. Options can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Import features into a 3D City Database"
)]
#[ortho_config(prefix = "CITYDB")]
pub(crate) struct ImportArgs {
    /// Path to the JSON feature stream.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// Path to the SQLite database; created when missing.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Rows buffered per table before a flush.
    #[arg(long = ARG_BATCH_SIZE, value_name = "rows")]
    #[serde(default)]
    pub(crate) batch_size: Option<usize>,
    /// Worker threads used for reference resolution.
    #[arg(long = ARG_THREADS, value_name = "count")]
    #[serde(default)]
    pub(crate) threads: Option<usize>,
    /// Directory holding the temporary reference store.
    #[arg(long = ARG_TEMP_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) temp_dir: Option<Utf8PathBuf>,
    /// Page cache size of the reference store in KiB.
    #[arg(long = ARG_CACHE_SIZE_KIB, value_name = "kib")]
    #[serde(default)]
    pub(crate) cache_size_kib: Option<u32>,
    /// Fail the import when a reference has no target.
    #[arg(
        long = ARG_STRICT_REFERENCES,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "bool"
    )]
    #[serde(default)]
    pub(crate) strict_references: Option<bool>,
}

impl ImportArgs {
    pub(crate) fn into_config(self) -> Result<ImportConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ImportConfig::try_from(merged)
    }
}

/// Resolved `import` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportConfig {
    /// Feature stream to read.
    pub(crate) input: Utf8PathBuf,
    /// Target database.
    pub(crate) database: Utf8PathBuf,
    /// Options handed to the importer.
    pub(crate) options: ImportOptions,
}

impl ImportConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.input, ARG_INPUT)?;
        self.options
            .validate()
            .map_err(|source| CliError::InvalidOptions { source })
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match citydb_fs::is_regular_file(path) {
            Ok(true) => Ok(()),
            Ok(false) if path.exists() => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Ok(false) => Err(CliError::MissingSourceFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl TryFrom<ImportArgs> for ImportConfig {
    type Error = CliError;

    fn try_from(args: ImportArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env: ENV_INPUT,
        })?;
        let database = args.database.ok_or(CliError::MissingArgument {
            field: ARG_DATABASE,
            env: ENV_DATABASE,
        })?;

        let mut options = ImportOptions::default();
        if let Some(batch_size) = args.batch_size {
            options = options.with_batch_size(batch_size);
        }
        if let Some(threads) = args.threads {
            options = options.with_threads(threads);
        }
        if let Some(temp_dir) = args.temp_dir {
            options = options.with_temp_dir(temp_dir);
        }
        if let Some(cache_size_kib) = args.cache_size_kib {
            options = options.with_cache_size_kib(cache_size_kib);
        }
        if let Some(strict) = args.strict_references {
            options = options.with_strict_references(strict);
        }

        Ok(Self {
            input,
            database,
            options,
        })
    }
}

pub(crate) fn run_import(args: ImportArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_import_with(args, &mut stdout)
}

pub(crate) fn run_import_with(args: ImportArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = resolve_import_config(args)?;
    let summary = execute_import(&config)?;
    write_summary(writer, &summary)
}

fn resolve_import_config(args: ImportArgs) -> Result<ImportConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

/// Open the database, stream every feature into one session and resolve
/// references.
pub(crate) fn execute_import(config: &ImportConfig) -> Result<ImportSummary, CliError> {
    let adapter = open_database(&config.database)?;
    let input = open_input(&config.input)?;
    let importer = Importer::new(adapter, &config.options)?;
    let mut session = importer.session()?;

    info!("importing features from {}", config.input);
    let features =
        serde_json::Deserializer::from_reader(BufReader::new(input)).into_iter::<Feature>();
    for (index, feature) in features.enumerate() {
        let feature = feature.map_err(|source| CliError::ParseFeature {
            path: config.input.clone(),
            index,
            source,
        })?;
        session.import_feature(&feature)?;
    }
    session.close()?;
    Ok(importer.finish()?)
}

fn open_database(path: &Utf8Path) -> Result<Arc<dyn DatabaseAdapter>, CliError> {
    let adapter =
        SqliteAdapter::open(path.to_path_buf()).map_err(|source| CliError::OpenDatabase {
            path: path.to_path_buf(),
            source,
        })?;
    let mut connection = adapter
        .connect()
        .map_err(|source| CliError::OpenDatabase {
            path: path.to_path_buf(),
            source,
        })?;
    initialise_schema(&mut connection).map_err(|source| CliError::InitialiseSchema {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Arc::new(adapter))
}

fn open_input(path: &Utf8Path) -> Result<File, CliError> {
    citydb_fs::open_utf8_file(path).map_err(|source| CliError::OpenInput {
        path: path.to_path_buf(),
        source,
    })
}

fn write_summary(writer: &mut dyn Write, summary: &ImportSummary) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(summary).map_err(CliError::SerialiseSummary)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteSummary)?;
    writer.write_all(b"\n").map_err(CliError::WriteSummary)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ImportConfig, CliError> {
    let merged = ImportArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ImportConfig::try_from(merged)
}
