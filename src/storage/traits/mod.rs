//! Storage traits.

mod record_store;

pub use record_store::{CollectionQuery, RecordStore};
