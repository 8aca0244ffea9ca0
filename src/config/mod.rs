//! Configuration management.

mod flags;

pub use flags::TriState;

use crate::io::CodecRegistry;
use crate::io::services::{
    ExportCollectionsOptions, ExportRecordsOptions, ImportCollectionsOptions, ImportRecordsOptions,
};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "BULKPORT_CONFIG_PATH";

/// Settings handed to the built-in codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecSettings {
    /// CSV field delimiter.
    pub csv_delimiter: u8,
    /// JSON indent for collection files. Empty means compact.
    pub json_collection_indent: String,
    /// JSON indent for records files. Empty means compact.
    pub json_records_indent: String,
    /// Root key holding the records array in TOML files.
    pub toml_records_array_key: String,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            csv_delimiter: b',',
            json_collection_indent: "\t".to_string(),
            json_records_indent: String::new(),
            toml_records_array_key: "records".to_string(),
        }
    }
}

/// Resolved options for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Store data directory.
    pub data_dir: PathBuf,
    /// Collections directory. Defaults next to the data directory.
    pub collections_dir: Option<PathBuf>,
    /// Records directory. Defaults next to the data directory.
    pub records_dir: Option<PathBuf>,
    /// Codec token for collections.
    pub collections_encoding: String,
    /// Codec token for records.
    pub records_encoding: String,
    /// Back up the store before an import.
    pub auto_backup: bool,
    /// Keep OAuth2 configuration on export and import.
    pub include_oauth2: bool,
    /// Save imported records without validation.
    pub no_validate: bool,
    /// Keep existing records on import.
    pub no_delete: bool,
    /// Force `verified` on imported auth records.
    pub override_verified: TriState,
    /// Force `emailVisibility` on imported auth records.
    pub override_email_visibility: TriState,
    /// Zero `updated` timestamps on collections export.
    pub reduce_git_diff: bool,
    /// Include system collections.
    pub system: bool,
    /// Collections to export or import records for. Empty means all.
    pub collections: Vec<String>,
    /// Codec settings.
    pub codecs: CodecSettings,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Collections directory.
    pub collections_dir: Option<String>,
    /// Records directory.
    pub records_dir: Option<String>,
    /// Collections codec token.
    pub collections_encoding: Option<String>,
    /// Records codec token.
    pub records_encoding: Option<String>,
    /// Auto backup.
    pub auto_backup: Option<bool>,
    /// Include OAuth2.
    pub include_oauth2: Option<bool>,
    /// Skip validation.
    pub no_validate: Option<bool>,
    /// Keep existing records.
    pub no_delete: Option<bool>,
    /// Verified override.
    pub override_verified: Option<bool>,
    /// Email visibility override.
    pub override_email_visibility: Option<bool>,
    /// Reduce git diff.
    pub reduce_git_diff: Option<bool>,
    /// Include system collections.
    pub system: Option<bool>,
    /// CSV section.
    pub csv: Option<ConfigFileCsv>,
    /// JSON section.
    pub json: Option<ConfigFileJson>,
    /// TOML section.
    pub toml: Option<ConfigFileToml>,
}

/// `[csv]` section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileCsv {
    /// Single-character delimiter.
    pub delimiter: Option<String>,
}

/// `[json]` section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileJson {
    /// Indent for collection files.
    pub collection_indent: Option<String>,
    /// Indent for records files.
    pub records_indent: Option<String>,
}

/// `[toml]` section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileToml {
    /// Records array key.
    pub records_array_key: Option<String>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("bk_data"),
            collections_dir: None,
            records_dir: None,
            collections_encoding: "json".to_string(),
            records_encoding: "csv".to_string(),
            auto_backup: true,
            include_oauth2: false,
            no_validate: false,
            no_delete: false,
            override_verified: TriState::Unset,
            override_email_visibility: TriState::Unset,
            reduce_git_diff: false,
            system: false,
            collections: Vec::new(),
            codecs: CodecSettings::default(),
        }
    }
}

/// Parses a CSV delimiter, which must be a single one-byte character.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for anything else.
pub fn parse_delimiter(s: &str) -> Result<u8> {
    match s.as_bytes() {
        [byte] if byte.is_ascii() && *byte != b'"' && *byte != b'\n' && *byte != b'\r' => {
            Ok(*byte)
        },
        _ => Err(Error::InvalidInput(format!(
            "csv delimiter must be exactly one character, got {s:?}"
        ))),
    }
}

impl TransferConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds an
    /// invalid codec setting.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks, in order:
    /// 1. The file named by `BULKPORT_CONFIG_PATH`
    /// 2. The platform config dir (`~/.config/bulkport/config.toml` on Linux)
    ///
    /// Returns the defaults if neither exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be loaded.
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.is_empty()
        {
            return Self::load_from_file(Path::new(&path));
        }

        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };
        let platform_config = base_dirs.config_dir().join("bulkport").join("config.toml");
        if platform_config.exists() {
            tracing::debug!(path = %platform_config.display(), "loading config");
            return Self::load_from_file(&platform_config);
        }

        Ok(Self::default())
    }

    /// Converts a `ConfigFile` to `TransferConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        config.collections_dir = file.collections_dir.map(PathBuf::from);
        config.records_dir = file.records_dir.map(PathBuf::from);
        if let Some(v) = file.collections_encoding {
            config.collections_encoding = v;
        }
        if let Some(v) = file.records_encoding {
            config.records_encoding = v;
        }
        if let Some(v) = file.auto_backup {
            config.auto_backup = v;
        }
        if let Some(v) = file.include_oauth2 {
            config.include_oauth2 = v;
        }
        if let Some(v) = file.no_validate {
            config.no_validate = v;
        }
        if let Some(v) = file.no_delete {
            config.no_delete = v;
        }
        config.override_verified = file.override_verified.into();
        config.override_email_visibility = file.override_email_visibility.into();
        if let Some(v) = file.reduce_git_diff {
            config.reduce_git_diff = v;
        }
        if let Some(v) = file.system {
            config.system = v;
        }

        if let Some(delimiter) = file.csv.and_then(|csv| csv.delimiter) {
            config.codecs.csv_delimiter = parse_delimiter(&delimiter)?;
        }
        if let Some(json) = file.json {
            if let Some(v) = json.collection_indent {
                config.codecs.json_collection_indent = v;
            }
            if let Some(v) = json.records_indent {
                config.codecs.json_records_indent = v;
            }
        }
        if let Some(v) = file.toml.and_then(|toml| toml.records_array_key) {
            if v.is_empty() {
                return Err(Error::InvalidInput(
                    "toml records_array_key must not be empty".to_string(),
                ));
            }
            config.codecs.toml_records_array_key = v;
        }

        Ok(config)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Resolved collections directory.
    #[must_use]
    pub fn collections_dir(&self) -> PathBuf {
        self.collections_dir
            .clone()
            .unwrap_or_else(|| self.migrations_dir().join("collections"))
    }

    /// Resolved records directory.
    #[must_use]
    pub fn records_dir(&self) -> PathBuf {
        self.records_dir
            .clone()
            .unwrap_or_else(|| self.migrations_dir().join("records"))
    }

    /// `migrations` directory next to the data directory.
    fn migrations_dir(&self) -> PathBuf {
        self.data_dir
            .parent()
            .map_or_else(|| self.data_dir.join(".."), Path::to_path_buf)
            .join("migrations")
    }

    /// Checks both encodings name a registered codec with the needed
    /// capability.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] listing the valid choices.
    pub fn validate(&self, registry: &CodecRegistry) -> Result<()> {
        check_encoding(
            "collections",
            &self.collections_encoding,
            &registry.collection_tokens(),
        )?;
        check_encoding(
            "records",
            &self.records_encoding,
            &registry.records_tokens(),
        )
    }

    /// Options for a collections export.
    #[must_use]
    pub fn export_collections_options(&self) -> ExportCollectionsOptions {
        ExportCollectionsOptions::new(self.collections_dir(), self.collections_encoding.clone())
            .with_system(self.system)
            .with_include_oauth2(self.include_oauth2)
            .with_reduce_git_diff(self.reduce_git_diff)
    }

    /// Options for a records export.
    #[must_use]
    pub fn export_records_options(&self) -> ExportRecordsOptions {
        ExportRecordsOptions::new(self.records_dir(), self.records_encoding.clone())
            .with_collections(self.collections.iter().cloned())
            .with_system(self.system)
    }

    /// Options for a collections import.
    #[must_use]
    pub fn import_collections_options(&self) -> ImportCollectionsOptions {
        ImportCollectionsOptions::new(self.collections_dir(), self.collections_encoding.clone())
            .with_auto_backup(self.auto_backup)
            .with_include_oauth2(self.include_oauth2)
    }

    /// Options for a records import.
    #[must_use]
    pub fn import_records_options(&self) -> ImportRecordsOptions {
        ImportRecordsOptions::new(self.records_dir(), self.records_encoding.clone())
            .with_auto_backup(self.auto_backup)
            .with_collections(self.collections.iter().cloned())
            .with_no_delete(self.no_delete)
            .with_no_validate(self.no_validate)
            .with_override_verified(self.override_verified)
            .with_override_email_visibility(self.override_email_visibility)
    }
}

fn check_encoding(kind: &str, token: &str, valid: &[&str]) -> Result<()> {
    if valid.contains(&token) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "invalid {kind} encoding {token:?}: Must be one of the following values: {}",
            valid.join(", ")
        )))
    }
}
