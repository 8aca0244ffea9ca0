//! Collection and record import service.
//!
//! Reads the data files of a directory back into a [`RecordStore`]. Schemas
//! are imported as one unit; records are imported collection by collection,
//! stopping at the first failure. Collections finished before a failure stay
//! committed.

use super::{collection_name, data_files, quoted, read_data_file};
use crate::config::TriState;
use crate::io::registry::CodecRegistry;
use crate::io::safety::{Confirmer, backup_name};
use crate::models::Record;
use crate::security::{new_record_id, random_string};
use crate::storage::RecordStore;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Length of the random password given to imported auth records.
const IMPORTED_PASSWORD_LENGTH: usize = 30;

/// Key of the OAuth2 block inside a decoded collection schema.
const OAUTH2_KEY: &str = "oauth2";

/// Options for importing collection schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCollectionsOptions {
    /// Source directory.
    pub dir: PathBuf,
    /// Codec token.
    pub encoding: String,
    /// Back up the store before changing it.
    pub auto_backup: bool,
    /// Import the OAuth2 block of each schema instead of keeping the stored one.
    pub include_oauth2: bool,
}

impl ImportCollectionsOptions {
    /// Creates options for `dir` using the `encoding` codec.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, encoding: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            encoding: encoding.into(),
            auto_backup: true,
            include_oauth2: false,
        }
    }

    /// Sets whether a backup is taken first.
    #[must_use]
    pub const fn with_auto_backup(mut self, auto_backup: bool) -> Self {
        self.auto_backup = auto_backup;
        self
    }

    /// Sets whether OAuth2 blocks are imported.
    #[must_use]
    pub const fn with_include_oauth2(mut self, include_oauth2: bool) -> Self {
        self.include_oauth2 = include_oauth2;
        self
    }
}

/// Options for importing records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRecordsOptions {
    /// Source directory.
    pub dir: PathBuf,
    /// Codec token.
    pub encoding: String,
    /// Back up the store before changing it.
    pub auto_backup: bool,
    /// Only import into these collections. Empty means all.
    pub collections: Vec<String>,
    /// Keep existing records instead of deleting them first.
    pub no_delete: bool,
    /// Save without validation.
    pub no_validate: bool,
    /// Force the `verified` flag of imported auth records.
    pub override_verified: TriState,
    /// Force the `emailVisibility` flag of imported auth records.
    pub override_email_visibility: TriState,
}

impl ImportRecordsOptions {
    /// Creates options for `dir` using the `encoding` codec.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, encoding: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            encoding: encoding.into(),
            auto_backup: true,
            collections: Vec::new(),
            no_delete: false,
            no_validate: false,
            override_verified: TriState::Unset,
            override_email_visibility: TriState::Unset,
        }
    }

    /// Sets whether a backup is taken first.
    #[must_use]
    pub const fn with_auto_backup(mut self, auto_backup: bool) -> Self {
        self.auto_backup = auto_backup;
        self
    }

    /// Restricts the import to the named collections.
    #[must_use]
    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = collections.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether existing records are kept.
    #[must_use]
    pub const fn with_no_delete(mut self, no_delete: bool) -> Self {
        self.no_delete = no_delete;
        self
    }

    /// Sets whether validation is skipped.
    #[must_use]
    pub const fn with_no_validate(mut self, no_validate: bool) -> Self {
        self.no_validate = no_validate;
        self
    }

    /// Sets the `verified` override.
    #[must_use]
    pub const fn with_override_verified(mut self, value: TriState) -> Self {
        self.override_verified = value;
        self
    }

    /// Sets the `emailVisibility` override.
    #[must_use]
    pub const fn with_override_email_visibility(mut self, value: TriState) -> Self {
        self.override_email_visibility = value;
        self
    }

    fn wants(&self, collection: &str) -> bool {
        self.collections.is_empty() || self.collections.iter().any(|c| c == collection)
    }
}

/// What an import changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Name of the backup taken first, if any.
    pub backup: Option<String>,
    /// Collections imported, in file order.
    pub collections: Vec<String>,
    /// Records saved per collection. Empty for a collections import.
    pub records: BTreeMap<String, usize>,
}

/// Result of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The operator declined; nothing was touched.
    Cancelled,
    /// The import ran to completion.
    Completed(ImportReport),
}

impl ImportOutcome {
    /// Returns `true` if the operator declined.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the report of a completed import.
    #[must_use]
    pub const fn report(&self) -> Option<&ImportReport> {
        match self {
            Self::Cancelled => None,
            Self::Completed(report) => Some(report),
        }
    }
}

/// Imports collections and records into a [`RecordStore`].
pub struct ImportService<'a> {
    store: &'a dyn RecordStore,
    registry: &'a CodecRegistry,
    confirmer: &'a dyn Confirmer,
}

impl<'a> ImportService<'a> {
    /// Creates a new import service.
    #[must_use]
    pub fn new(
        store: &'a dyn RecordStore,
        registry: &'a CodecRegistry,
        confirmer: &'a dyn Confirmer,
    ) -> Self {
        Self {
            store,
            registry,
            confirmer,
        }
    }

    /// Imports every collection schema found in the directory.
    ///
    /// All schemas are handed to the store in one call; collections missing
    /// from the directory are deleted (system collections excepted).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCollectionCodec`] for an unusable encoding, or an
    /// I/O, codec or store error. A failed backup aborts before any change.
    pub fn import_collections(&self, options: &ImportCollectionsOptions) -> Result<ImportOutcome> {
        let (token, codec) = self.registry.collection_codec(&options.encoding)?;
        tracing::info!("Set to encoding: {token}");
        ensure_source_dir(options)?;

        let message = format!(
            "Do you really want to import collections from {}",
            quoted(&options.dir)
        );
        if !self.confirmer.confirm(&message, false)? {
            tracing::warn!(dir = %options.dir.display(), "collections import cancelled");
            return Ok(ImportOutcome::Cancelled);
        }

        let mut report = ImportReport {
            backup: self.backup_if(options.auto_backup, "import_collections")?,
            ..ImportReport::default()
        };

        let mut schemas = Vec::new();
        for path in data_files(&options.dir, token)? {
            let mut schema = read_data_file(&path, |r| codec.decode_collection(r))?;
            if !options.include_oauth2 {
                schema.remove(OAUTH2_KEY);
            }
            if let Some(name) = schema.get("name").and_then(|v| v.as_str()) {
                report.collections.push(name.to_string());
            }
            schemas.push(schema);
        }

        if schemas.is_empty() {
            tracing::warn!(
                dir = %options.dir.display(),
                "no collection files found; every non-system collection will be removed"
            );
        }

        self.store.import_collections(schemas, true)?;
        tracing::info!(count = report.collections.len(), "collections imported");
        Ok(ImportOutcome::Completed(report))
    }

    /// Imports the records files found in the directory.
    ///
    /// Each file `<name>.<ext>` is loaded into collection `<name>`. Unless
    /// `no_delete` is set, the collection's existing records are deleted
    /// once its file has been decoded. Auth records get a fresh random
    /// password and token key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRecordsCodec`] for an unusable encoding, an I/O
    /// error if the directory is missing and [`Error::MissingCollections`]
    /// if a requested collection does not exist, all before anything is
    /// touched. Stops at the first codec or store error; collections
    /// imported before the error stay imported.
    pub fn import_records(&self, options: &ImportRecordsOptions) -> Result<ImportOutcome> {
        let (token, codec) = self.registry.records_codec(&options.encoding)?;
        tracing::info!("Set to encoding: {token}");
        if !options.dir.is_dir() {
            return Err(Error::io(
                "import_records",
                &options.dir,
                "directory does not exist",
            ));
        }
        self.ensure_collections_exist(&options.collections)?;

        let mut message = if options.collections.is_empty() {
            format!(
                "Do you really want to import records from data files in {}?",
                quoted(&options.dir)
            )
        } else {
            format!(
                "Do you really want to import records to the listed collections to {}?\n\
                 Collections: {}",
                quoted(&options.dir),
                options.collections.join(", ")
            )
        };
        if !options.no_delete {
            message.push_str("\nWarning this will delete all current records in these collections!");
        }
        if !self.confirmer.confirm(&message, false)? {
            tracing::warn!(dir = %options.dir.display(), "records import cancelled");
            return Ok(ImportOutcome::Cancelled);
        }

        let mut report = ImportReport {
            backup: self.backup_if(options.auto_backup, "import_records")?,
            ..ImportReport::default()
        };

        for path in data_files(&options.dir, token)? {
            let Some(name) = collection_name(&path) else {
                continue;
            };
            if !options.wants(name) {
                tracing::debug!(collection = name, "skipping collection not in filter");
                continue;
            }

            let collection = Arc::new(self.store.find_collection(name)?);
            let mut records = read_data_file(&path, |r| codec.decode_records(&collection, r))?;

            if !options.no_delete {
                self.store.delete_all_records(&collection.name)?;
            }

            tracing::info!("Importing {} to collection {}.", records.len(), collection.name);
            for record in &mut records {
                prepare_record(record, options);
                if options.no_validate {
                    self.store.save_no_validate(record)?;
                } else {
                    self.store.save(record)?;
                }
            }

            report.records.insert(collection.name.clone(), records.len());
            report.collections.push(collection.name.clone());
        }

        Ok(ImportOutcome::Completed(report))
    }

    /// Fails with every requested name the store does not know.
    fn ensure_collections_exist(&self, names: &[String]) -> Result<()> {
        let mut missing = Vec::new();
        for name in names {
            match self.store.find_collection(name) {
                Ok(_) => {},
                Err(Error::CollectionNotFound(_)) => missing.push(name.clone()),
                Err(e) => return Err(e),
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingCollections(missing))
        }
    }

    fn backup_if(&self, enabled: bool, prefix: &str) -> Result<Option<String>> {
        if !enabled {
            return Ok(None);
        }
        let name = backup_name(prefix);
        tracing::info!("Making backup {name}");
        let name = self.store.create_backup(&name)?;
        Ok(Some(name))
    }
}

fn ensure_source_dir(options: &ImportCollectionsOptions) -> Result<()> {
    if options.dir.is_dir() {
        Ok(())
    } else {
        Err(Error::io(
            "import_collections",
            &options.dir,
            "directory does not exist",
        ))
    }
}

/// Forces insert semantics, fills a missing id and regenerates auth secrets.
fn prepare_record(record: &mut Record, options: &ImportRecordsOptions) {
    record.mark_as_new();
    if record.id().is_empty() {
        record.set_id(new_record_id());
    }

    if !record.collection().is_auth() {
        return;
    }

    record.set_password(&random_string(IMPORTED_PASSWORD_LENGTH));
    record.refresh_token_key();
    record.clear_plain_password();

    if let Some(verified) = options.override_verified.value() {
        record.set_verified(verified);
    }
    if let Some(visible) = options.override_email_visibility.value() {
        record.set_email_visibility(visible);
    }
}
