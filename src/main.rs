//! Binary entry point for bulkport.
//!
//! This binary provides the CLI interface for bulk collection and record
//! import/export.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use bulkport::cli::{self, Cli};
use bulkport::observability;
use clap::Parser;
use std::process::ExitCode;

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = observability::init_from_env(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    let mut stdout = std::io::stdout().lock();
    match cli::run(&cli, &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}
