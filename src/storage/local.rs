//! Embedded record store.
//!
//! Keeps all collections and records in memory behind a [`Mutex`]. When opened
//! on a directory, the whole state is written to `<dir>/store.json` after every
//! mutation, and backups land in `<dir>/backups/<name>.json`.

use crate::models::{Collection, DateTime, Record};
use crate::security::new_record_id;
use crate::storage::traits::{CollectionQuery, RecordStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// State file name inside the data directory.
const STATE_FILE: &str = "store.json";

/// Backup directory name inside the data directory.
const BACKUPS_DIR: &str = "backups";

/// Highest numeric suffix tried for a taken backup name.
const MAX_BACKUP_SUFFIX: usize = 1000;

/// `name` for the first attempt, `name_<n>` afterwards.
fn numbered_backup_name(name: &str, n: usize) -> String {
    if n == 1 {
        name.to_string()
    } else {
        format!("{name}_{n}")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(default)]
    collections: Vec<Collection>,
    /// Rows keyed by collection id.
    #[serde(default)]
    records: BTreeMap<String, Vec<StoredRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password_hash: Option<String>,
}

impl StoredRecord {
    fn from_record(record: &Record) -> Self {
        Self {
            data: record.data().clone(),
            password_hash: record
                .password()
                .map(|p| p.hash.clone())
                .filter(|h| !h.is_empty()),
        }
    }

    fn id(&self) -> &str {
        self.data
            .get(crate::models::FIELD_ID)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    fn to_record(&self, collection: &Arc<Collection>) -> Record {
        let mut record = Record::new(Arc::clone(collection));
        record.load(self.data.clone());
        if let Some(hash) = &self.password_hash {
            record.set_password_hash(hash.clone());
        }
        record.mark_as_not_new();
        record
    }
}

impl StoreState {
    fn collection(&self, name_or_id: &str) -> Option<&Collection> {
        self.collections
            .iter()
            .find(|c| c.id == name_or_id || c.name.eq_ignore_ascii_case(name_or_id))
    }
}

/// Embedded [`RecordStore`] implementation.
///
/// # Example
///
/// ```rust,ignore
/// use bulkport::storage::LocalStore;
/// use bulkport::models::Collection;
///
/// let store = LocalStore::in_memory();
/// store.save_collection(Collection::new_base("posts"))?;
/// ```
#[derive(Debug)]
pub struct LocalStore {
    data_dir: Option<PathBuf>,
    state: Mutex<StoreState>,
    memory_backups: Mutex<Vec<String>>,
}

impl LocalStore {
    /// Creates an empty store that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            state: Mutex::new(StoreState::default()),
            memory_backups: Mutex::new(Vec::new()),
        }
    }

    /// Opens (or creates) a store persisted under `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the state file
    /// cannot be read or parsed.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|e| Error::io("create_data_dir", &data_dir, e))?;

        let state_path = data_dir.join(STATE_FILE);
        let state = if state_path.exists() {
            let raw =
                fs::read(&state_path).map_err(|e| Error::io("read_store", &state_path, e))?;
            serde_json::from_slice(&raw).map_err(|e| Error::io("parse_store", &state_path, e))?
        } else {
            StoreState::default()
        };

        tracing::debug!(path = %data_dir.display(), "opened local store");

        Ok(Self {
            data_dir: Some(data_dir),
            state: Mutex::new(state),
            memory_backups: Mutex::new(Vec::new()),
        })
    }

    /// Returns the data directory, if persisted.
    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Creates or replaces a single collection (matched by id or name).
    ///
    /// # Errors
    ///
    /// Returns an error if the collection fails validation.
    pub fn save_collection(&self, mut collection: Collection) -> Result<()> {
        collection.validate()?;
        if collection.id.is_empty() {
            collection.id = format!("pbc_{}", new_record_id());
        }

        let mut state = self.lock()?;
        let position = state
            .collections
            .iter()
            .position(|c| c.id == collection.id || c.name == collection.name);
        match position {
            Some(index) => state.collections[index] = collection,
            None => state.collections.push(collection),
        }
        self.persist(&state)
    }

    /// Lists the names of backups taken so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the backups directory cannot be read.
    pub fn backup_names(&self) -> Result<Vec<String>> {
        let Some(dir) = &self.data_dir else {
            return self
                .memory_backups
                .lock()
                .map(|names| names.clone())
                .map_err(|e| Error::Store(format!("backup list lock poisoned: {e}")));
        };

        let backups = dir.join(BACKUPS_DIR);
        if !backups.exists() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&backups).map_err(|e| Error::io("read_backups", &backups, e))?;
        let mut names: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                entry
                    .path()
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(String::from)
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state.lock().map_err(|e| Error::OperationFailed {
            operation: "lock_store".to_string(),
            cause: e.to_string(),
        })
    }

    fn persist(&self, state: &StoreState) -> Result<()> {
        let Some(dir) = &self.data_dir else {
            return Ok(());
        };
        let path = dir.join(STATE_FILE);
        let tmp = dir.join(format!("{STATE_FILE}.tmp"));

        let json = serde_json::to_vec_pretty(state).map_err(|e| Error::OperationFailed {
            operation: "serialize_store".to_string(),
            cause: e.to_string(),
        })?;
        fs::write(&tmp, json).map_err(|e| Error::io("write_store", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| Error::io("write_store", &path, e))
    }

    /// Builds the collection an imported map describes, overlaying the map on
    /// the existing collection with the same id or name.
    fn merge_collection(
        existing: Option<&Collection>,
        map: Map<String, Value>,
    ) -> Result<Collection> {
        let merged = match existing {
            Some(current) => {
                let mut base = match serde_json::to_value(current) {
                    Ok(Value::Object(base)) => base,
                    Ok(_) => Map::new(),
                    Err(e) => return Err(Error::Store(e.to_string())),
                };
                base.extend(map);
                base
            },
            None => map,
        };

        let mut collection: Collection =
            serde_json::from_value(Value::Object(merged)).map_err(|e| Error::Validation {
                collection: "<import>".to_string(),
                reason: e.to_string(),
            })?;
        if collection.id.is_empty() {
            collection.id = format!("pbc_{}", new_record_id());
        }
        if collection.created.is_zero() {
            collection.created = DateTime::now();
        }
        if collection.updated.is_zero() {
            collection.updated = DateTime::now();
        }
        collection.validate()?;
        Ok(collection)
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl RecordStore for LocalStore {
    fn list_collections(&self, query: &CollectionQuery) -> Result<Vec<Collection>> {
        let state = self.lock()?;
        Ok(state
            .collections
            .iter()
            .filter(|c| query.matches(c))
            .cloned()
            .collect())
    }

    fn find_collection(&self, name_or_id: &str) -> Result<Collection> {
        let state = self.lock()?;
        state
            .collection(name_or_id)
            .cloned()
            .ok_or_else(|| Error::CollectionNotFound(name_or_id.to_string()))
    }

    fn find_all_records(&self, collection: &Arc<Collection>) -> Result<Vec<Record>> {
        let state = self.lock()?;
        Ok(state
            .records
            .get(&collection.id)
            .map(|rows| rows.iter().map(|row| row.to_record(collection)).collect())
            .unwrap_or_default())
    }

    fn create_backup(&self, name: &str) -> Result<String> {
        let state = self.lock()?;

        let Some(dir) = &self.data_dir else {
            let mut names = self
                .memory_backups
                .lock()
                .map_err(|e| Error::Store(format!("backup list lock poisoned: {e}")))?;
            let name = (1..)
                .map(|n| numbered_backup_name(name, n))
                .find(|candidate| !names.contains(candidate))
                .unwrap_or_else(|| name.to_string());
            names.push(name.clone());
            return Ok(name);
        };

        let backups = dir.join(BACKUPS_DIR);
        fs::create_dir_all(&backups).map_err(|e| Error::io("create_backup", &backups, e))?;

        let json = serde_json::to_vec_pretty(&*state).map_err(|e| Error::OperationFailed {
            operation: "serialize_backup".to_string(),
            cause: e.to_string(),
        })?;

        for n in 1..=MAX_BACKUP_SUFFIX {
            let candidate = numbered_backup_name(name, n);
            let path = backups.join(format!("{candidate}.json"));
            let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Error::io("create_backup", &path, e)),
            };
            file.write_all(&json)
                .map_err(|e| Error::io("create_backup", &path, e))?;

            tracing::info!(backup = %path.display(), "backup created");
            return Ok(candidate);
        }

        Err(Error::io(
            "create_backup",
            &backups.join(name),
            "too many backups with this name",
        ))
    }

    fn import_collections(
        &self,
        collections: Vec<Map<String, Value>>,
        delete_missing: bool,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let mut next = state.collections.clone();
        let mut imported: HashSet<String> = HashSet::with_capacity(collections.len());

        for map in collections {
            let key = |k: &str| {
                map.get(k)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            let (id, name) = (key("id"), key("name"));

            let position = next.iter().position(|c| {
                (!id.is_empty() && c.id == id) || (!name.is_empty() && c.name == name)
            });
            let collection = Self::merge_collection(position.map(|i| &next[i]), map)?;

            if !imported.insert(collection.id.clone()) {
                return Err(Error::Validation {
                    collection: collection.name,
                    reason: "imported more than once".to_string(),
                });
            }

            match position {
                Some(index) => next[index] = collection,
                None => next.push(collection),
            }
        }

        let mut names = HashSet::with_capacity(next.len());
        for collection in &next {
            if !names.insert(collection.name.to_lowercase()) {
                return Err(Error::Validation {
                    collection: collection.name.clone(),
                    reason: "duplicate collection name".to_string(),
                });
            }
        }

        if delete_missing {
            let removed: Vec<String> = next
                .iter()
                .filter(|c| !c.system && !imported.contains(&c.id))
                .map(|c| c.id.clone())
                .collect();
            next.retain(|c| !removed.contains(&c.id));
            for id in &removed {
                state.records.remove(id);
            }
            if !removed.is_empty() {
                tracing::info!(count = removed.len(), "removed collections missing from import");
            }
        }

        state.collections = next;
        self.persist(&state)
    }

    fn save(&self, record: &mut Record) -> Result<()> {
        record.validate()?;
        self.save_no_validate(record)
    }

    fn save_no_validate(&self, record: &mut Record) -> Result<()> {
        let mut state = self.lock()?;

        let collection = record.collection();
        let known = state
            .collection(&collection.id)
            .ok_or_else(|| Error::CollectionNotFound(collection.name.clone()))?;
        if known.is_view() {
            return Err(Error::Store(format!(
                "cannot save records into view collection '{}'",
                known.name
            )));
        }
        let collection_id = known.id.clone();

        if record.id().is_empty() {
            record.set_id(new_record_id());
        }

        let stored = StoredRecord::from_record(record);
        let rows = state.records.entry(collection_id).or_default();
        let existing = rows.iter().position(|row| row.id() == record.id());

        match (record.is_new(), existing) {
            (true, None) => rows.push(stored),
            (false, Some(index)) => rows[index] = stored,
            (true, Some(_)) => {
                return Err(Error::Validation {
                    collection: record.collection().name.clone(),
                    reason: format!("record id {:?} already exists", record.id()),
                });
            },
            (false, None) => {
                return Err(Error::Store(format!(
                    "record {:?} not found in '{}'",
                    record.id(),
                    record.collection().name
                )));
            },
        }

        self.persist(&state)?;
        record.mark_as_not_new();
        Ok(())
    }

    fn delete_all_records(&self, collection_name: &str) -> Result<()> {
        let mut state = self.lock()?;
        let id = state
            .collection(collection_name)
            .map(|c| c.id.clone())
            .ok_or_else(|| Error::CollectionNotFound(collection_name.to_string()))?;
        let removed = state.records.remove(&id).map_or(0, |rows| rows.len());
        tracing::debug!(collection = collection_name, removed, "deleted all records");
        self.persist(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        FIELD_EMAIL, FIELD_PASSWORD, Field, FieldKind, OAuth2Config, OAuth2Provider,
    };
    use serde_json::json;
    use tempfile::TempDir;

    fn posts() -> Collection {
        Collection::new_base("posts").with_field(Field::new("title", FieldKind::Text))
    }

    fn insert_post(store: &LocalStore, collection: &Arc<Collection>, title: &str) -> Record {
        let mut record = Record::new(Arc::clone(collection));
        record.set("title", json!(title));
        store.save(&mut record).unwrap();
        record
    }

    #[test]
    fn test_save_assigns_id_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.save_collection(posts()).unwrap();
        let collection = Arc::new(store.find_collection("posts").unwrap());

        let record = insert_post(&store, &collection, "Hello");
        assert_eq!(record.id().len(), 15);
        assert!(!record.is_new());

        let reopened = LocalStore::open(dir.path()).unwrap();
        let collection = Arc::new(reopened.find_collection("posts").unwrap());
        let records = reopened.find_all_records(&collection).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_string("title"), "Hello");
    }

    #[test]
    fn test_insert_duplicate_id_rejected() {
        let store = LocalStore::in_memory();
        store.save_collection(posts()).unwrap();
        let collection = Arc::new(store.find_collection("posts").unwrap());

        let first = insert_post(&store, &collection, "a");
        let mut dup = Record::new(Arc::clone(&collection));
        dup.set_id(first.id());
        assert!(store.save(&mut dup).is_err());
    }

    #[test]
    fn test_delete_all_records() {
        let store = LocalStore::in_memory();
        store.save_collection(posts()).unwrap();
        let collection = Arc::new(store.find_collection("posts").unwrap());
        insert_post(&store, &collection, "a");
        insert_post(&store, &collection, "b");

        assert_eq!(store.count_records("posts").unwrap(), 2);
        store.delete_all_records("posts").unwrap();
        assert_eq!(store.count_records("posts").unwrap(), 0);
        assert!(matches!(
            store.delete_all_records("missing"),
            Err(Error::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_password_hash_survives_reload() {
        let store = LocalStore::in_memory();
        store.save_collection(Collection::new_auth("users")).unwrap();
        let users = Arc::new(store.find_collection("users").unwrap());

        let mut record = Record::new(Arc::clone(&users));
        record.set(FIELD_EMAIL, json!("a@example.com"));
        record.set(FIELD_PASSWORD, json!("secret"));
        store.save(&mut record).unwrap();

        let loaded = store.find_all_records(&users).unwrap();
        let password = loaded[0].password().unwrap();
        assert!(password.plain.is_empty());
        assert!(crate::security::verify_password("secret", &password.hash));
    }

    #[test]
    fn test_import_overlays_and_keeps_oauth2() {
        let store = LocalStore::in_memory();
        let mut users = Collection::new_auth("users");
        users.oauth2 = Some(OAuth2Config {
            enabled: true,
            providers: vec![OAuth2Provider {
                name: "google".into(),
                client_id: "id".into(),
                client_secret: "secret".into(),
            }],
        });
        store.save_collection(users.clone()).unwrap();

        let mut map = match serde_json::to_value(&users).unwrap() {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        map.remove("oauth2");

        store.import_collections(vec![map], true).unwrap();
        let stored = store.find_collection("users").unwrap();
        assert_eq!(stored.oauth2, users.oauth2);
    }

    #[test]
    fn test_import_delete_missing_spares_system() {
        let store = LocalStore::in_memory();
        store.save_collection(posts()).unwrap();
        store
            .save_collection(Collection::new_base("_internal").with_system(true))
            .unwrap();

        let tags = Collection::new_base("tags");
        let map = match serde_json::to_value(&tags).unwrap() {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        store.import_collections(vec![map], true).unwrap();

        let all = store
            .list_collections(&CollectionQuery::new().with_system(true))
            .unwrap();
        let names: Vec<&str> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["_internal", "tags"]);
    }

    #[test]
    fn test_import_rejects_invalid_as_a_whole() {
        let store = LocalStore::in_memory();
        store.save_collection(posts()).unwrap();

        let good = match serde_json::to_value(Collection::new_base("tags")).unwrap() {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let mut bad = Map::new();
        bad.insert("name".into(), json!("bad name"));

        assert!(store.import_collections(vec![good, bad], true).is_err());
        let names: Vec<String> = store
            .list_collections(&CollectionQuery::new())
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["posts"]);
    }

    #[test]
    fn test_backup_written_to_disk() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        store.save_collection(posts()).unwrap();

        let name = store.create_backup("pb_backup_20240101000000").unwrap();
        assert_eq!(name, "pb_backup_20240101000000");
        assert!(dir.path().join("backups/pb_backup_20240101000000.json").exists());
        assert_eq!(
            store.backup_names().unwrap(),
            vec!["pb_backup_20240101000000".to_string()]
        );
    }

    #[test]
    fn test_backup_name_taken_gets_suffix() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        let names: Vec<String> = (0..3)
            .map(|_| store.create_backup("import_records_20240101000000").unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "import_records_20240101000000",
                "import_records_20240101000000_2",
                "import_records_20240101000000_3",
            ]
        );
        assert_eq!(store.backup_names().unwrap(), names);

        let memory = LocalStore::in_memory();
        memory.create_backup("b").unwrap();
        assert_eq!(memory.create_backup("b").unwrap(), "b_2");
    }

    #[test]
    fn test_list_collections_filters() {
        let store = LocalStore::in_memory();
        store.save_collection(posts()).unwrap();
        store
            .save_collection(Collection::new_base("_internal").with_system(true))
            .unwrap();

        assert_eq!(store.list_collections(&CollectionQuery::new()).unwrap().len(), 1);
        assert_eq!(
            store
                .list_collections(&CollectionQuery::new().with_system(true))
                .unwrap()
                .len(),
            2
        );
        assert_eq!(
            store
                .list_collections(&CollectionQuery::new().with_names(["nope"]))
                .unwrap()
                .len(),
            0
        );
    }
}
