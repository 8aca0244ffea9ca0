//! `import` subcommands.

use super::{
    CANCELLED_MESSAGE, CollectionsEncoding, RecordsEncoding, clean_names, parse_bool_flag,
    parse_tristate_flag, write_line,
};
use crate::Result;
use crate::config::{TransferConfig, TriState};
use crate::io::{CodecRegistry, Confirmer, ImportOutcome, ImportService};
use crate::storage::RecordStore;
use clap::{Args, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// What to import.
#[derive(Debug, Subcommand)]
pub enum ImportCommand {
    /// Import collection schemas; collections not in the directory are deleted.
    #[command(visible_aliases = ["collection", "col", "c"])]
    Collections(ImportCollectionsArgs),

    /// Import records files into their collections.
    #[command(visible_aliases = ["record", "rec", "r"])]
    Records(ImportRecordsArgs),
}

/// Flags for `import collections`.
#[derive(Debug, Clone, Args)]
pub struct ImportCollectionsArgs {
    /// Encoding.
    #[command(flatten)]
    pub encoding: CollectionsEncoding,

    /// Source directory.
    #[arg(long)]
    pub collections_dir: Option<PathBuf>,

    /// Back up the store first.
    #[arg(long, value_name = "BOOL", value_parser = parse_bool_flag)]
    pub auto_backup: Option<bool>,

    /// Import OAuth2 configuration instead of keeping the stored one.
    #[arg(long)]
    pub include_oauth2: bool,
}

/// Flags for `import records`.
#[derive(Debug, Clone, Args)]
pub struct ImportRecordsArgs {
    /// Encoding.
    #[command(flatten)]
    pub encoding: RecordsEncoding,

    /// Source directory.
    #[arg(long)]
    pub records_dir: Option<PathBuf>,

    /// Back up the store first.
    #[arg(long, value_name = "BOOL", value_parser = parse_bool_flag)]
    pub auto_backup: Option<bool>,

    /// Collections to import (comma separated, repeatable).
    #[arg(long = "collection", visible_alias = "collections", value_delimiter = ',')]
    pub collections: Vec<String>,

    /// Force the `verified` flag of imported auth records.
    #[arg(long, value_name = "BOOL", value_parser = parse_tristate_flag)]
    pub override_verified: Option<TriState>,

    /// Force the `emailVisibility` flag of imported auth records.
    #[arg(long, value_name = "BOOL", value_parser = parse_tristate_flag)]
    pub override_email_visibility: Option<TriState>,

    /// Save records without validation.
    #[arg(long)]
    pub no_validate: bool,

    /// Keep existing records instead of deleting them first.
    #[arg(long)]
    pub no_delete: bool,
}

impl ImportCommand {
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
                if let Some(auto_backup) = args.auto_backup {
                    config.auto_backup = auto_backup;
                }
                config.include_oauth2 |= args.include_oauth2;
            },
            Self::Records(args) => {
                if let Some(token) = args.encoding.token() {
                    config.records_encoding = token.to_string();
                }
                if let Some(dir) = &args.records_dir {
                    config.records_dir = Some(dir.clone());
                }
                if let Some(auto_backup) = args.auto_backup {
                    config.auto_backup = auto_backup;
                }
                config.collections = clean_names(&args.collections);
                if let Some(value) = args.override_verified {
                    config.override_verified = value;
                }
                if let Some(value) = args.override_email_visibility {
                    config.override_email_visibility = value;
                }
                config.no_validate |= args.no_validate;
                config.no_delete |= args.no_delete;
            },
        }
    }
}

pub(super) fn run(
    command: &ImportCommand,
    config: &TransferConfig,
    store: &dyn RecordStore,
    registry: &CodecRegistry,
    confirmer: &dyn Confirmer,
    out: &mut dyn Write,
) -> Result<()> {
    let service = ImportService::new(store, registry, confirmer);
    let outcome = match command {
        ImportCommand::Collections(_) => {
            service.import_collections(&config.import_collections_options())?
        },
        ImportCommand::Records(_) => service.import_records(&config.import_records_options())?,
    };

    let report = match outcome {
        ImportOutcome::Cancelled => return write_line(out, CANCELLED_MESSAGE),
        ImportOutcome::Completed(report) => report,
    };

    if let Some(backup) = &report.backup {
        write_line(out, &format!("Backup created: {backup}"))?;
    }
    match command {
        ImportCommand::Collections(_) => write_line(
            out,
            &format!("Imported {} collections.", report.collections.len()),
        ),
        ImportCommand::Records(_) => {
            for (collection, count) in &report.records {
                write_line(out, &format!("Imported {count} records to {collection}."))?;
            }
            Ok(())
        },
    }
}
