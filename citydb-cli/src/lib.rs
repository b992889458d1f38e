//! Command-line interface for importing city models into a 3D City Database.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod error;
mod import;

pub use error::CliError;

use import::{ImportArgs, run_import};

pub(crate) const ARG_INPUT: &str = "input";
pub(crate) const ARG_DATABASE: &str = "database";
pub(crate) const ARG_BATCH_SIZE: &str = "batch-size";
pub(crate) const ARG_THREADS: &str = "threads";
pub(crate) const ARG_TEMP_DIR: &str = "temp-dir";
pub(crate) const ARG_CACHE_SIZE_KIB: &str = "cache-size-kib";
pub(crate) const ARG_STRICT_REFERENCES: &str = "strict-references";
pub(crate) const ENV_INPUT: &str = "CITYDB_CMDS_IMPORT_INPUT";
pub(crate) const ENV_DATABASE: &str = "CITYDB_CMDS_IMPORT_DATABASE";

const DEFAULT_LOG_FILTER: &str = "info";

/// Run the citydb CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging();
    match cli.command {
        Command::Import(args) => run_import(args),
    }
}

/// Install a stderr subscriber that also receives `log` records from the
/// library crates. `RUST_LOG` overrides the default `info` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // A subscriber may already be installed when embedded in tests.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Parser)]
#[command(
    name = "citydb",
    about = "Import city model features into a 3D City Database",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import a stream of JSON-encoded features and resolve their references.
    Import(ImportArgs),
}

#[cfg(test)]
mod tests;
