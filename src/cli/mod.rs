//! CLI command implementations.
//!
//! # Commands
//!
//! | Command | Aliases | Description |
//! |---------|---------|-------------|
//! | `export collections` | `collection`, `col`, `c` | Write every collection schema to a directory |
//! | `export records` | `record`, `rec`, `r` | Write the records of each collection to a directory |
//! | `import collections` | `collection`, `col`, `c` | Replace the schemas with those in a directory |
//! | `import records` | `record`, `rec`, `r` | Load records files into their collections |
//!
//! # Example Usage
//!
//! ```bash
//! # Export every schema as YAML, without noisy timestamps
//! bulkport export collections --yml --reduce-git-diff
//!
//! # Export two collections as CSV
//! bulkport export records --csv --collection posts,comments
//!
//! # Re-import users, marking them verified, without prompting
//! bulkport --yes import records --collection users --override-verified true
//! ```

mod export;
mod import;

pub use export::{ExportCollectionsArgs, ExportCommand, ExportRecordsArgs};
pub use import::{ImportCollectionsArgs, ImportCommand, ImportRecordsArgs};

use crate::config::{TransferConfig, TriState};
use crate::io::{AssumeYes, CodecRegistry, Confirmer, TerminalConfirmer};
use crate::models::parse_bool_literal;
use crate::storage::LocalStore;
use crate::Result;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// Message shown when the operator declines a prompt.
pub const CANCELLED_MESSAGE: &str = "The command has been cancelled.";

/// Bulkport - bulk import and export of collections and records.
#[derive(Debug, Parser)]
#[command(name = "bulkport")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "BULKPORT_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Store data directory.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Answer yes to every confirmation prompt.
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Export collections or records to files.
    #[command(subcommand)]
    Export(ExportCommand),

    /// Import collections or records from files.
    #[command(subcommand)]
    Import(ImportCommand),
}

/// Mutually exclusive codec selection for collections.
#[derive(Debug, Clone, Default, Args)]
#[group(multiple = false)]
pub struct CollectionsEncoding {
    /// Use JSON.
    #[arg(long)]
    pub json: bool,
    /// Use YAML.
    #[arg(long, visible_alias = "yaml")]
    pub yml: bool,
    /// Use TOML.
    #[arg(long)]
    pub toml: bool,
}

impl CollectionsEncoding {
    /// Selected token, if any flag was given.
    #[must_use]
    pub const fn token(&self) -> Option<&'static str> {
        if self.json {
            Some("json")
        } else if self.yml {
            Some("yml")
        } else if self.toml {
            Some("toml")
        } else {
            None
        }
    }
}

/// Mutually exclusive codec selection for records.
#[derive(Debug, Clone, Default, Args)]
#[group(multiple = false)]
pub struct RecordsEncoding {
    /// Use CSV.
    #[arg(long)]
    pub csv: bool,
    /// Use JSON.
    #[arg(long)]
    pub json: bool,
    /// Use YAML.
    #[arg(long, visible_alias = "yaml")]
    pub yml: bool,
    /// Use TOML.
    #[arg(long)]
    pub toml: bool,
}

impl RecordsEncoding {
    /// Selected token, if any flag was given.
    #[must_use]
    pub const fn token(&self) -> Option<&'static str> {
        if self.csv {
            Some("csv")
        } else if self.json {
            Some("json")
        } else if self.yml {
            Some("yml")
        } else if self.toml {
            Some("toml")
        } else {
            None
        }
    }
}

/// Parses a lenient boolean flag value.
///
/// # Errors
///
/// Returns a message for anything `parse_bool_literal` rejects.
pub fn parse_bool_flag(s: &str) -> std::result::Result<bool, String> {
    parse_bool_literal(s).ok_or_else(|| format!("invalid boolean value {s:?}"))
}

/// Parses a tri-state override flag value.
///
/// # Errors
///
/// Returns a message for anything `parse_bool_literal` rejects.
pub fn parse_tristate_flag(s: &str) -> std::result::Result<TriState, String> {
    s.parse::<TriState>().map_err(|e| e.to_string())
}

/// Splits, trims and drops empty collection names.
fn clean_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

impl Cli {
    /// Loads the configuration file and applies the command-line flags.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file exists but cannot be loaded.
    pub fn resolve_config(&self) -> Result<TransferConfig> {
        let mut config = match &self.config {
            Some(path) => TransferConfig::load_from_file(path)?,
            None => TransferConfig::load_default()?,
        };
        self.apply(&mut config);
        Ok(config)
    }

    /// Applies the command-line flags on top of `config`.
    pub fn apply(&self, config: &mut TransferConfig) {
        if let Some(data_dir) = &self.data_dir {
            config.data_dir.clone_from(data_dir);
        }
        match &self.command {
            Command::Export(command) => command.apply(config),
            Command::Import(command) => command.apply(config),
        }
    }
}

/// Runs the parsed command, writing user-facing output to `out`.
///
/// # Errors
///
/// Returns configuration, lookup, selection, I/O and store errors.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let config = cli.resolve_config()?;
    let registry = CodecRegistry::with_settings(&config.codecs);
    config.validate(&registry)?;

    let store = LocalStore::open(&config.data_dir)?;
    let confirmer: Box<dyn Confirmer> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalConfirmer::stdio())
    };

    match &cli.command {
        Command::Export(command) => {
            export::run(command, &config, &store, &registry, confirmer.as_ref(), out)
        },
        Command::Import(command) => {
            import::run(command, &config, &store, &registry, confirmer.as_ref(), out)
        },
    }
}

fn write_line(out: &mut dyn Write, line: &str) -> Result<()> {
    writeln!(out, "{line}").map_err(|e| crate::Error::OperationFailed {
        operation: "write_output".to_string(),
        cause: e.to_string(),
    })
}
