//! Collection and record export service.
//!
//! Drives a codec to write one file per collection into a destination
//! directory, asking for confirmation before the directory is wiped.

use super::{ensure_dir, quoted, wipe_dir, write_data_file};
use crate::io::registry::CodecRegistry;
use crate::io::safety::Confirmer;
use crate::models::{Collection, DateTime, OAuth2Config};
use crate::storage::{CollectionQuery, RecordStore};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Options for exporting collection schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportCollectionsOptions {
    /// Destination directory. Wiped before writing.
    pub dir: PathBuf,
    /// Codec token.
    pub encoding: String,
    /// Include system collections.
    pub system: bool,
    /// Keep the OAuth2 configuration of auth collections.
    pub include_oauth2: bool,
    /// Zero the `updated` timestamp to keep exports stable under version control.
    pub reduce_git_diff: bool,
}

impl ExportCollectionsOptions {
    /// Creates options for `dir` using the `encoding` codec.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, encoding: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            encoding: encoding.into(),
            system: false,
            include_oauth2: false,
            reduce_git_diff: false,
        }
    }

    /// Sets whether system collections are exported.
    #[must_use]
    pub const fn with_system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }

    /// Sets whether OAuth2 configuration is kept.
    #[must_use]
    pub const fn with_include_oauth2(mut self, include_oauth2: bool) -> Self {
        self.include_oauth2 = include_oauth2;
        self
    }

    /// Sets whether `updated` timestamps are zeroed.
    #[must_use]
    pub const fn with_reduce_git_diff(mut self, reduce_git_diff: bool) -> Self {
        self.reduce_git_diff = reduce_git_diff;
        self
    }
}

/// Options for exporting records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRecordsOptions {
    /// Destination directory. Wiped first only when `collections` is empty.
    pub dir: PathBuf,
    /// Codec token.
    pub encoding: String,
    /// Collections to export. Empty means all.
    pub collections: Vec<String>,
    /// Include system collections.
    pub system: bool,
}

impl ExportRecordsOptions {
    /// Creates options for `dir` using the `encoding` codec.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, encoding: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            encoding: encoding.into(),
            collections: Vec::new(),
            system: false,
        }
    }

    /// Restricts the export to the named collections.
    #[must_use]
    pub fn with_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections = collections.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether system collections are exported.
    #[must_use]
    pub const fn with_system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }
}

/// What an export wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Files written, in order.
    pub files: Vec<PathBuf>,
    /// Records written per collection. Empty for a collections export.
    pub records: BTreeMap<String, usize>,
}

/// Result of an export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The operator declined; nothing was touched.
    Cancelled,
    /// The export ran to completion.
    Completed(ExportReport),
}

impl ExportOutcome {
    /// Returns `true` if the operator declined.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the report of a completed export.
    #[must_use]
    pub const fn report(&self) -> Option<&ExportReport> {
        match self {
            Self::Cancelled => None,
            Self::Completed(report) => Some(report),
        }
    }
}

/// Exports collections and records from a [`RecordStore`].
pub struct ExportService<'a> {
    store: &'a dyn RecordStore,
    registry: &'a CodecRegistry,
    confirmer: &'a dyn Confirmer,
}

impl<'a> ExportService<'a> {
    /// Creates a new export service.
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

    /// Exports every collection schema to `<dir>/<name>.<ext>`.
    ///
    /// The destination directory is wiped after confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCollectionCodec`] for an unusable encoding, or an
    /// I/O, codec or store error. Files written before the error remain.
    pub fn export_collections(&self, options: &ExportCollectionsOptions) -> Result<ExportOutcome> {
        let (token, codec) = self.registry.collection_codec(&options.encoding)?;
        tracing::info!("Set to encoding: {token}");

        let message = format!(
            "Do you really want to export all collections to {}?\n\
             Warning: This will delete all the contents of the directory!",
            quoted(&options.dir)
        );
        if !self.confirmer.confirm(&message, false)? {
            tracing::warn!(dir = %options.dir.display(), "collections export cancelled");
            return Ok(ExportOutcome::Cancelled);
        }

        wipe_dir(&options.dir)?;
        ensure_dir(&options.dir)?;

        let query = CollectionQuery::new().with_system(options.system);
        let mut report = ExportReport::default();
        for mut collection in self.store.list_collections(&query)? {
            if collection.is_auth() && !options.include_oauth2 {
                collection.oauth2 = Some(OAuth2Config::default());
            }
            if options.reduce_git_diff {
                collection.updated = DateTime::zero();
            }

            let path = data_path(&options.dir, &collection.name, token);
            write_data_file(&path, |w| codec.encode_collection(&collection, w))?;
            tracing::debug!(collection = %collection.name, path = %path.display(), "exported collection");
            report.files.push(path);
        }

        tracing::info!(
            count = report.files.len(),
            dir = %options.dir.display(),
            "collections exported"
        );
        Ok(ExportOutcome::Completed(report))
    }

    /// Exports records, one file per collection.
    ///
    /// With an explicit collection list only those collections are written
    /// and the rest of the directory is left alone; otherwise the directory
    /// is wiped first. View collections are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingCollections`] if a requested collection does
    /// not exist and [`Error::NothingToExport`] if nothing matched, both
    /// before anything is touched. Also returns I/O, codec or store errors.
    pub fn export_records(&self, options: &ExportRecordsOptions) -> Result<ExportOutcome> {
        let (token, codec) = self.registry.records_codec(&options.encoding)?;
        tracing::info!("Set to encoding: {token}");

        let collections = self.select_collections(options)?;
        let filtered = !options.collections.is_empty();

        let message = if filtered {
            format!(
                "Do you really want to export records from the listed collections to {}?\n\
                 Collections: {}",
                quoted(&options.dir),
                options.collections.join(", ")
            )
        } else {
            format!(
                "Do you really want to export records from all collections to {}?\n\
                 Warning: This will delete all the contents of the directory!",
                quoted(&options.dir)
            )
        };
        if !self.confirmer.confirm(&message, false)? {
            tracing::warn!(dir = %options.dir.display(), "records export cancelled");
            return Ok(ExportOutcome::Cancelled);
        }

        if !filtered {
            wipe_dir(&options.dir)?;
        }
        ensure_dir(&options.dir)?;

        let mut report = ExportReport::default();
        for collection in collections {
            if collection.is_view() {
                tracing::debug!(collection = %collection.name, "skipping view collection");
                continue;
            }

            let collection = Arc::new(collection);
            let records = self.store.find_all_records(&collection)?;
            let path = data_path(&options.dir, &collection.name, token);
            write_data_file(&path, |w| codec.encode_records(&collection, &records, w))?;

            tracing::info!(
                collection = %collection.name,
                count = records.len(),
                "exported records"
            );
            report.records.insert(collection.name.clone(), records.len());
            report.files.push(path);
        }

        Ok(ExportOutcome::Completed(report))
    }

    fn select_collections(&self, options: &ExportRecordsOptions) -> Result<Vec<Collection>> {
        let query = CollectionQuery::new()
            .with_names(options.collections.iter().cloned())
            .with_system(options.system);
        let collections = self.store.list_collections(&query)?;

        let missing: Vec<String> = options
            .collections
            .iter()
            .filter(|name| !collections.iter().any(|c| &c.name == *name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingCollections(missing));
        }
        if collections.is_empty() {
            return Err(Error::NothingToExport);
        }

        Ok(collections)
    }
}

fn data_path(dir: &Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{name}.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::safety::{AssumeYes, ScriptedConfirmer};
    use crate::models::{Field, FieldKind, Record};
    use crate::storage::LocalStore;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with_posts(count: usize) -> LocalStore {
        let store = LocalStore::in_memory();
        store
            .save_collection(
                Collection::new_base("posts").with_field(Field::new("title", FieldKind::Text)),
            )
            .unwrap();
        store
            .save_collection(Collection::new_view("post_stats", "SELECT 1"))
            .unwrap();
        store
            .save_collection(Collection::new_base("_logs").with_system(true))
            .unwrap();

        let posts = Arc::new(store.find_collection("posts").unwrap());
        for i in 0..count {
            let mut record = Record::new(Arc::clone(&posts));
            record.set("title", json!(format!("post {i}")));
            store.save(&mut record).unwrap();
        }
        store
    }

    #[test]
    fn test_export_collections_wipes_dir() {
        let store = store_with_posts(0);
        let registry = CodecRegistry::with_defaults();
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("collections");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("stale.json"), "{}").unwrap();

        let service = ExportService::new(&store, &registry, &AssumeYes);
        let outcome = service
            .export_collections(&ExportCollectionsOptions::new(&dir, "json"))
            .unwrap();

        let report = outcome.report().unwrap();
        assert_eq!(report.files.len(), 2);
        assert!(dir.join("posts.json").exists());
        assert!(dir.join("post_stats.json").exists());
        assert!(!dir.join("_logs.json").exists());
        assert!(!dir.join("stale.json").exists());
    }

    #[test]
    fn test_export_collections_rejects_records_only_codec() {
        let store = store_with_posts(0);
        let registry = CodecRegistry::with_defaults();
        let tmp = TempDir::new().unwrap();
        let service = ExportService::new(&store, &registry, &AssumeYes);

        let err = service
            .export_collections(&ExportCollectionsOptions::new(tmp.path(), "csv"))
            .unwrap_err();
        assert!(matches!(err, Error::NoCollectionCodec(token) if token == "csv"));
    }

    #[test]
    fn test_cancel_leaves_directory_alone() {
        let store = store_with_posts(1);
        let registry = CodecRegistry::with_defaults();
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("keep.csv"), "x").unwrap();

        let confirmer = ScriptedConfirmer::new([false]);
        let service = ExportService::new(&store, &registry, &confirmer);
        let outcome = service
            .export_records(&ExportRecordsOptions::new(tmp.path(), "csv"))
            .unwrap();

        assert!(outcome.is_cancelled());
        assert!(tmp.path().join("keep.csv").exists());
        assert!(confirmer.prompts()[0].contains("from all collections"));
    }

    #[test]
    fn test_export_records_skips_views() {
        let store = store_with_posts(2);
        let registry = CodecRegistry::with_defaults();
        let tmp = TempDir::new().unwrap();
        let service = ExportService::new(&store, &registry, &AssumeYes);

        let outcome = service
            .export_records(&ExportRecordsOptions::new(tmp.path(), "yml"))
            .unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.records.get("posts"), Some(&2));
        assert!(!report.records.contains_key("post_stats"));
        assert!(!tmp.path().join("post_stats.yml").exists());
    }

    #[test]
    fn test_missing_collections_fail_before_prompt() {
        let store = store_with_posts(1);
        let registry = CodecRegistry::with_defaults();
        let tmp = TempDir::new().unwrap();
        let confirmer = ScriptedConfirmer::new([]);
        let service = ExportService::new(&store, &registry, &confirmer);

        let options = ExportRecordsOptions::new(tmp.path().join("out"), "csv")
            .with_collections(["posts", "ghosts", "_logs"]);
        let err = service.export_records(&options).unwrap_err();

        assert!(matches!(
            &err,
            Error::MissingCollections(names) if names == &["ghosts", "_logs"]
        ));
        assert!(confirmer.prompts().is_empty());
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn test_nothing_to_export() {
        let store = LocalStore::in_memory();
        let registry = CodecRegistry::with_defaults();
        let tmp = TempDir::new().unwrap();
        let service = ExportService::new(&store, &registry, &AssumeYes);

        let err = service
            .export_records(&ExportRecordsOptions::new(tmp.path(), "csv"))
            .unwrap_err();
        assert!(matches!(err, Error::NothingToExport));
    }
}
