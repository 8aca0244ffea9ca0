//! Import/export I/O subsystem.
//!
//! Moves collection schemas and records between a
//! [`RecordStore`](crate::storage::RecordStore) and a directory holding one
//! file per collection.
//!
//! # Architecture
//!
//! - **Codecs** implement [`Codec`] and expose [`CollectionCodec`] and/or
//!   [`RecordsCodec`] capabilities
//! - **Registry** maps a token (the file extension) to its codec
//! - **Services** orchestrate the directory, the codec and the store
//! - **Safety** asks for confirmation before anything destructive
//!
//! # Supported Formats
//!
//! | Token | Collections | Records | Notes |
//! |-------|-------------|---------|-------|
//! | `csv` | - | ✓ | Header row of field names, `""` for null |
//! | `json` | ✓ | ✓ | Configurable indents |
//! | `yml` | ✓ | ✓ | Root sequence of records |
//! | `toml` | ✓ | ✓ | Records under a root key, default `records` |
//!
//! # Example
//!
//! ```rust,ignore
//! use bulkport::io::{CodecRegistry, ImportRecordsOptions, ImportService};
//! use bulkport::io::safety::AssumeYes;
//!
//! let registry = CodecRegistry::with_defaults();
//! let service = ImportService::new(&store, &registry, &AssumeYes);
//! let options = ImportRecordsOptions::new("migrations/records", "csv")
//!     .with_collections(["posts"])
//!     .with_no_delete(true);
//! service.import_records(&options)?;
//! ```

pub mod formats;
pub mod registry;
pub mod safety;
pub mod services;
pub mod traits;

pub use registry::CodecRegistry;
pub use safety::{AssumeYes, Confirmer, ScriptedConfirmer, TerminalConfirmer};
pub use services::{
    ExportCollectionsOptions, ExportOutcome, ExportRecordsOptions, ExportReport, ExportService,
    ImportCollectionsOptions, ImportOutcome, ImportRecordsOptions, ImportReport, ImportService,
};
pub use traits::{Codec, CollectionCodec, CollectionMap, RecordsCodec};
