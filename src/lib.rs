//! # Bulkport
//!
//! Bulk import and export of collection schemas and their records.
//!
//! Collections ("schemas") and records ("rows") held by a [`RecordStore`] are
//! written to one file per collection in a pluggable encoding and read back,
//! reconstructing schema and rows.
//!
//! ## Features
//!
//! - Codec contract with an explicit, per-process [`CodecRegistry`]
//! - Four reference codecs: CSV (records only), JSON, YAML and TOML
//! - Export and import orchestration with confirmation before destructive steps
//! - Optional backup of the store before any import mutates it
//! - Auth secrets (password hashes, token keys) are never written to export files
//!   and are always regenerated on import
//!
//! ## Example
//!
//! ```rust,ignore
//! use bulkport::io::{CodecRegistry, ExportService, ExportRecordsOptions};
//! use bulkport::io::safety::AssumeYes;
//! use bulkport::storage::LocalStore;
//!
//! let store = LocalStore::open("bk_data")?;
//! let registry = CodecRegistry::with_defaults();
//! let service = ExportService::new(&store, &registry, &AssumeYes);
//! let outcome = service.export_records(&ExportRecordsOptions::new("records", "csv"))?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod io;
pub mod models;
pub mod observability;
pub mod security;
pub mod storage;

// Re-exports for convenience
pub use config::{TransferConfig, TriState};
pub use io::{CodecRegistry, ExportService, ImportService};
pub use models::{Collection, CollectionKind, DateTime, Field, FieldKind, Record};
pub use storage::{LocalStore, RecordStore};

/// Error type for bulkport operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Unknown encoding, malformed config values, bad tri-state literal |
/// | `NoCollectionCodec` | Encoding token has no codec able to handle collections |
/// | `NoRecordsCodec` | Encoding token has no codec able to handle records |
/// | `MissingCollections` | Explicitly requested collections are not in the store |
/// | `NothingToExport` | A records export resolved to an empty collection set |
/// | `OperationFailed` | Filesystem I/O fails (directory wipe, create, open, read) |
/// | `Codec` | A codec cannot encode or decode a payload |
/// | `CollectionNotFound` | Lookup by name or id misses |
/// | `Validation` | A record or schema is rejected by the store |
/// | `Store` | Any other store failure |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised when:
    /// - The configured encoding is not one of the registered options
    /// - A tri-state flag literal is not a recognised boolean
    /// - The CSV delimiter is not exactly one character
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No registered codec handles collections for the requested token.
    #[error("no collection encoding handler was installed for '{0}'")]
    NoCollectionCodec(String),

    /// No registered codec handles records for the requested token.
    #[error("no records encoding handler was installed for '{0}'")]
    NoRecordsCodec(String),

    /// Explicitly requested collections that do not exist.
    #[error("collection(s) do not exist: {}", .0.join(", "))]
    MissingCollections(Vec<String>),

    /// A records export matched no collections at all.
    #[error("no collections to export records")]
    NothingToExport,

    /// An operation failed.
    ///
    /// Raised when:
    /// - Directory removal or creation fails
    /// - A data file cannot be created, opened or read
    /// - The store cannot persist its state
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A codec failed to encode or decode.
    #[error("{format} codec error: {cause}")]
    Codec {
        /// Codec token (file extension).
        format: String,
        /// The underlying cause.
        cause: String,
    },

    /// A collection lookup by name or id failed.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// The store rejected a record or collection.
    #[error("validation failed for '{collection}': {reason}")]
    Validation {
        /// Collection the rejected value belongs to.
        collection: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Any other store failure.
    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// Builds an [`Error::OperationFailed`] naming the path involved.
    pub fn io(operation: &str, path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: format!("{}: {err}", path.display()),
        }
    }

    /// Builds an [`Error::Codec`] for the given format token.
    pub fn codec(format: &str, cause: impl std::fmt::Display) -> Self {
        Self::Codec {
            format: format.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for bulkport operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::MissingCollections(vec!["c".to_string(), "d".to_string()]);
        assert_eq!(err.to_string(), "collection(s) do not exist: c, d");

        let err = Error::io("create_dir", Path::new("out/records"), "denied");
        assert_eq!(
            err.to_string(),
            "operation 'create_dir' failed: out/records: denied"
        );

        let err = Error::NoRecordsCodec("xml".to_string());
        assert!(err.to_string().contains("no records encoding handler"));
    }
}
