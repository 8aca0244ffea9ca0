//! Record store abstraction.
//!
//! The import/export services only talk to a [`RecordStore`]; [`LocalStore`]
//! is the embedded implementation used by the binary and the tests.

// Allow significant_drop_tightening - mutations hold the lock until persisted.
#![allow(clippy::significant_drop_tightening)]

mod local;
pub mod traits;

pub use local::LocalStore;
pub use traits::{CollectionQuery, RecordStore};
