//! Built-in codecs.
//!
//! | Token | Collections | Records | Records layout |
//! |-------|-------------|---------|----------------|
//! | `csv` | - | ✓ | header row of field names, one row per record |
//! | `json` | ✓ | ✓ | root array of record objects |
//! | `toml` | ✓ | ✓ | root table with one array-of-tables key |
//! | `yml` | ✓ | ✓ | root sequence of record maps |
//!
//! The markup codecs add `collectionId` and `collectionName` to every record
//! map; both are ignored on decode since they are not fields.

pub mod csv;
pub mod json;
pub mod toml;
pub mod yaml;

pub use self::csv::CsvCodec;
pub use self::json::JsonCodec;
pub use self::toml::TomlCodec;
pub use self::yaml::YamlCodec;

use crate::models::{Collection, Record};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Extra key carrying the owning collection id in markup record maps.
pub const KEY_COLLECTION_ID: &str = "collectionId";

/// Extra key carrying the owning collection name in markup record maps.
pub const KEY_COLLECTION_NAME: &str = "collectionName";

/// Builds the map written for one record by the markup codecs.
pub(crate) fn record_to_map(record: &Record) -> Map<String, Value> {
    let collection = record.collection();
    let mut map = Map::with_capacity(collection.fields.len() + 2);
    map.insert(
        KEY_COLLECTION_ID.to_string(),
        Value::String(collection.id.clone()),
    );
    map.insert(
        KEY_COLLECTION_NAME.to_string(),
        Value::String(collection.name.clone()),
    );
    map.extend(record.export_map());
    map
}

/// Builds records from decoded maps, skipping keys that are not fields.
pub(crate) fn records_from_values(
    format: &str,
    collection: &Arc<Collection>,
    values: Vec<Value>,
) -> Result<Vec<Record>> {
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(map) => {
                let mut record = Record::new(Arc::clone(collection));
                record.load(map);
                Ok(record)
            },
            other => Err(Error::codec(
                format,
                format!("record #{index} is not a map: {other}"),
            )),
        })
        .collect()
}

/// Requires a decoded collection payload to be a map.
pub(crate) fn expect_map(format: &str, value: Value) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::codec(
            format,
            format!("collection payload is not a map: {}", type_name(&other)),
        )),
    }
}

/// Short JSON type name for error messages.
pub(crate) const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, FieldKind};
    use serde_json::json;

    #[test]
    fn test_record_to_map_carries_collection_keys() {
        let posts = Arc::new(
            Collection::new_base("posts").with_field(Field::new("title", FieldKind::Text)),
        );
        let mut record = Record::new(Arc::clone(&posts));
        record.set_id("p1");
        record.set("title", json!("Hi"));

        let map = record_to_map(&record);
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["collectionId", "collectionName", "id", "title"]);
        assert_eq!(map[KEY_COLLECTION_NAME], json!("posts"));
    }

    #[test]
    fn test_records_from_values_rejects_scalars() {
        let posts = Arc::new(Collection::new_base("posts"));
        let err = records_from_values("json", &posts, vec![json!({"id": "a"}), json!(3)]);
        assert!(matches!(err, Err(Error::Codec { .. })));
    }
}
