//! `export` subcommands.

use super::{CANCELLED_MESSAGE, CollectionsEncoding, RecordsEncoding, clean_names, write_line};
use crate::Result;
use crate::config::TransferConfig;
use crate::io::{CodecRegistry, Confirmer, ExportOutcome, ExportService};
use crate::storage::RecordStore;
use clap::{Args, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// What to export.
#[derive(Debug, Subcommand)]
pub enum ExportCommand {
    /// Export collection schemas, one file per collection.
    #[command(visible_aliases = ["collection", "col", "c"])]
    Collections(ExportCollectionsArgs),

    /// Export records, one file per collection.
    #[command(visible_aliases = ["record", "rec", "r"])]
    Records(ExportRecordsArgs),
}

/// Flags for `export collections`.
#[derive(Debug, Clone, Args)]
pub struct ExportCollectionsArgs {
    /// Encoding.
    #[command(flatten)]
    pub encoding: CollectionsEncoding,

    /// Destination directory (wiped first).
    #[arg(long)]
    pub collections_dir: Option<PathBuf>,

    /// Zero `updated` timestamps to reduce version-control noise.
    #[arg(long)]
    pub reduce_git_diff: bool,

    /// Include system collections.
    #[arg(long)]
    pub system: bool,

    /// Keep OAuth2 configuration of auth collections.
    #[arg(long)]
    pub include_oauth2: bool,
}

/// Flags for `export records`.
#[derive(Debug, Clone, Args)]
pub struct ExportRecordsArgs {
    /// Encoding.
    #[command(flatten)]
    pub encoding: RecordsEncoding,

    /// Destination directory (wiped first unless collections are listed).
    #[arg(long)]
    pub records_dir: Option<PathBuf>,

    /// Collections to export (comma separated, repeatable).
    #[arg(long = "collection", visible_alias = "collections", value_delimiter = ',')]
    pub collections: Vec<String>,

    /// Include system collections.
    #[arg(long)]
    pub system: bool,
}

impl ExportCommand {
    /// Applies the flags on top of `config`.
    pub fn apply(&self, config: &mut TransferConfig) {
        match self {
            Self::Collections(args) => {
                if let Some(token) = args.encoding.token() {
                    config.collections_encoding = token.to_string();
                }
                if let Some(dir) = &args.collections_dir {
                    config.collections_dir = Some(dir.clone());
                }
                config.reduce_git_diff |= args.reduce_git_diff;
                config.system |= args.system;
                config.include_oauth2 |= args.include_oauth2;
            },
            Self::Records(args) => {
                if let Some(token) = args.encoding.token() {
                    config.records_encoding = token.to_string();
                }
                if let Some(dir) = &args.records_dir {
                    config.records_dir = Some(dir.clone());
                }
                config.collections = clean_names(&args.collections);
                config.system |= args.system;
            },
        }
    }
}

pub(super) fn run(
    command: &ExportCommand,
    config: &TransferConfig,
    store: &dyn RecordStore,
    registry: &CodecRegistry,
    confirmer: &dyn Confirmer,
    out: &mut dyn Write,
) -> Result<()> {
    let service = ExportService::new(store, registry, confirmer);
    let outcome = match command {
        ExportCommand::Collections(_) => {
            service.export_collections(&config.export_collections_options())?
        },
        ExportCommand::Records(_) => service.export_records(&config.export_records_options())?,
    };

    match outcome {
        ExportOutcome::Cancelled => write_line(out, CANCELLED_MESSAGE),
        ExportOutcome::Completed(report) => {
            for path in &report.files {
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or_default();
                let line = report.records.get(name).map_or_else(
                    || format!("Exported {}", path.display()),
                    |count| format!("Exported {count} records to {}", path.display()),
                );
                write_line(out, &line)?;
            }
            Ok(())
        },
    }
}
