//! Codec registry.

use super::formats::{CsvCodec, JsonCodec, TomlCodec, YamlCodec};
use super::traits::{Codec, CollectionCodec, RecordsCodec};
use crate::config::CodecSettings;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Maps codec tokens (file extensions) to codec instances.
///
/// Built once at startup and passed by reference to the services. Registering
/// a token twice replaces the earlier codec.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: BTreeMap<String, Arc<dyn Codec>>,
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("tokens", &self.tokens())
            .finish()
    }
}

impl CodecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the four built-in codecs with default
    /// settings.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::with_settings(&CodecSettings::default())
    }

    /// Creates a registry holding the four built-in codecs.
    #[must_use]
    pub fn with_settings(settings: &CodecSettings) -> Self {
        let mut registry = Self::new();
        registry.register(CsvCodec::new(settings.csv_delimiter));
        registry.register(JsonCodec::new(
            settings.json_collection_indent.clone(),
            settings.json_records_indent.clone(),
        ));
        registry.register(TomlCodec::new(settings.toml_records_array_key.clone()));
        registry.register(YamlCodec::new());
        registry
    }

    /// Registers a codec under its file extension, replacing any previous
    /// codec with the same token.
    pub fn register(&mut self, codec: impl Codec + 'static) {
        self.register_arc(Arc::new(codec));
    }

    /// Registers a shared codec.
    pub fn register_arc(&mut self, codec: Arc<dyn Codec>) {
        let token = codec.file_extension().to_string();
        if self.codecs.insert(token.clone(), codec).is_some() {
            tracing::debug!(token, "replaced codec");
        }
    }

    /// Looks up a codec by token.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&Arc<dyn Codec>> {
        self.codecs.get(token)
    }

    /// Looks up a codec able to handle collections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCollectionCodec`] if the token is unknown or the
    /// codec lacks the capability.
    pub fn collection_codec(&self, token: &str) -> Result<(&str, &dyn CollectionCodec)> {
        self.codecs
            .get(token)
            .and_then(|codec| {
                codec
                    .as_collection_codec()
                    .map(|c| (codec.file_extension(), c))
            })
            .ok_or_else(|| Error::NoCollectionCodec(token.to_string()))
    }

    /// Looks up a codec able to handle records.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRecordsCodec`] if the token is unknown or the codec
    /// lacks the capability.
    pub fn records_codec(&self, token: &str) -> Result<(&str, &dyn RecordsCodec)> {
        self.codecs
            .get(token)
            .and_then(|codec| codec.as_records_codec().map(|c| (codec.file_extension(), c)))
            .ok_or_else(|| Error::NoRecordsCodec(token.to_string()))
    }

    /// All registered tokens, sorted.
    #[must_use]
    pub fn tokens(&self) -> Vec<&str> {
        self.codecs.keys().map(String::as_str).collect()
    }

    /// Tokens of codecs that handle collections, sorted.
    #[must_use]
    pub fn collection_tokens(&self) -> Vec<&str> {
        self.codecs
            .iter()
            .filter(|(_, codec)| codec.supports_collections())
            .map(|(token, _)| token.as_str())
            .collect()
    }

    /// Tokens of codecs that handle records, sorted.
    #[must_use]
    pub fn records_tokens(&self) -> Vec<&str> {
        self.codecs
            .iter()
            .filter(|(_, codec)| codec.supports_records())
            .map(|(token, _)| token.as_str())
            .collect()
    }
}
