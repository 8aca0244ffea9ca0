//! Core traits for import/export codecs.
//!
//! A [`Codec`] names its file extension and exposes the capabilities it
//! supports. Capabilities are queried through [`Codec::as_collection_codec`]
//! and [`Codec::as_records_codec`] rather than by downcasting.
//!
//! # Example Implementation
//!
//! ```rust,ignore
//! struct NdjsonCodec;
//!
//! impl Codec for NdjsonCodec {
//!     fn file_extension(&self) -> &str {
//!         "ndjson"
//!     }
//!
//!     fn as_records_codec(&self) -> Option<&dyn RecordsCodec> {
//!         Some(self)
//!     }
//! }
//! ```

use crate::Result;
use crate::models::{Collection, Record};
use serde_json::{Map, Value};
use std::io::{Read, Write};
use std::sync::Arc;

/// Generic, untyped collection schema as handed to
/// [`crate::storage::RecordStore::import_collections`].
pub type CollectionMap = Map<String, Value>;

/// An encoding format registered under its file extension.
pub trait Codec: Send + Sync {
    /// Canonical file extension, without the dot. Also the registry token.
    fn file_extension(&self) -> &str;

    /// Returns the collection capability, if supported.
    fn as_collection_codec(&self) -> Option<&dyn CollectionCodec> {
        None
    }

    /// Returns the records capability, if supported.
    fn as_records_codec(&self) -> Option<&dyn RecordsCodec> {
        None
    }

    /// Returns whether collections can be encoded and decoded.
    fn supports_collections(&self) -> bool {
        self.as_collection_codec().is_some()
    }

    /// Returns whether records can be encoded and decoded.
    fn supports_records(&self) -> bool {
        self.as_records_codec().is_some()
    }
}

/// Encodes and decodes a single collection schema.
pub trait CollectionCodec {
    /// Writes `collection` to `writer`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Codec`] if serialization or writing fails.
    fn encode_collection(&self, collection: &Collection, writer: &mut dyn Write) -> Result<()>;

    /// Reads one collection schema as a generic map.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Codec`] if the payload is malformed or is not a
    /// map at the top level.
    fn decode_collection(&self, reader: &mut dyn Read) -> Result<CollectionMap>;
}

/// Encodes and decodes the records of one collection.
pub trait RecordsCodec {
    /// Writes `records` of `collection` to `writer`.
    ///
    /// Password fields and the auth token key are never written.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Codec`] if serialization or writing fails.
    fn encode_records(
        &self,
        collection: &Collection,
        records: &[Record],
        writer: &mut dyn Write,
    ) -> Result<()>;

    /// Reads records of `collection`. Keys that are not fields of the
    /// collection are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Codec`] if the payload is malformed.
    fn decode_records(
        &self,
        collection: &Arc<Collection>,
        reader: &mut dyn Read,
    ) -> Result<Vec<Record>>;
}
