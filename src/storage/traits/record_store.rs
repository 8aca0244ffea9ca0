//! Record store trait.

use crate::Result;
use crate::models::{Collection, Record};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Filter for [`RecordStore::list_collections`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionQuery {
    /// Restrict to these collection names. Empty means all.
    pub names: Vec<String>,
    /// Include system collections.
    pub include_system: bool,
}

impl CollectionQuery {
    /// Creates a query matching every non-system collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the query to the given names.
    #[must_use]
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether system collections are included.
    #[must_use]
    pub const fn with_system(mut self, include_system: bool) -> Self {
        self.include_system = include_system;
        self
    }

    /// Returns whether a collection satisfies the query.
    #[must_use]
    pub fn matches(&self, collection: &Collection) -> bool {
        (self.include_system || !collection.system)
            && (self.names.is_empty() || self.names.iter().any(|n| n == &collection.name))
    }
}

/// The structured record store that collections and records are moved in and
/// out of.
///
/// Every method takes `&self`; implementations handle their own locking.
pub trait RecordStore: Send + Sync {
    /// Lists collections matching the query.
    fn list_collections(&self, query: &CollectionQuery) -> Result<Vec<Collection>>;

    /// Finds a collection by name or id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CollectionNotFound`] when nothing matches.
    fn find_collection(&self, name_or_id: &str) -> Result<Collection>;

    /// Fetches every record of a collection.
    fn find_all_records(&self, collection: &Arc<Collection>) -> Result<Vec<Record>>;

    /// Takes a full snapshot of the store under `name`.
    ///
    /// Returns the name actually used: when `name` is taken, the first free
    /// `<name>_2`, `<name>_3`, ... is used instead.
    fn create_backup(&self, name: &str) -> Result<String>;

    /// Upserts collection schemas given as generic maps, as one unit.
    ///
    /// With `delete_missing`, non-system collections absent from `collections`
    /// are removed together with their records. Nothing is changed if any map
    /// is rejected.
    fn import_collections(
        &self,
        collections: Vec<Map<String, Value>>,
        delete_missing: bool,
    ) -> Result<()>;

    /// Validates and saves a record.
    fn save(&self, record: &mut Record) -> Result<()>;

    /// Saves a record without validation.
    fn save_no_validate(&self, record: &mut Record) -> Result<()>;

    /// Deletes every record of the named collection.
    fn delete_all_records(&self, collection_name: &str) -> Result<()>;

    /// Returns the number of records in the named collection.
    fn count_records(&self, collection_name: &str) -> Result<usize> {
        let collection = Arc::new(self.find_collection(collection_name)?);
        Ok(self.find_all_records(&collection)?.len())
    }
}
