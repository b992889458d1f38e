//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use citydb_cli::CliError;

fn main() {
    match citydb_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("citydb: {err}");
            std::process::exit(1);
        }
    }
}
