//! TOML codec.
//!
//! TOML has no `null` and no root-level arrays: `null` values are dropped on
//! encode, and records are wrapped in a root table under a configurable key
//! (default `records`). TOML datetimes decode to their string form.

use super::{expect_map, record_to_map, records_from_values};
use crate::io::traits::{Codec, CollectionCodec, CollectionMap, RecordsCodec};
use crate::models::{Collection, Record};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::io::{Read, Write};
use std::sync::Arc;

/// Token and file extension.
pub const TOKEN: &str = "toml";

/// Default records array key.
pub const DEFAULT_RECORDS_ARRAY_KEY: &str = "records";

/// TOML codec for collections and records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TomlCodec {
    records_array_key: String,
}

impl Default for TomlCodec {
    fn default() -> Self {
        Self::new(DEFAULT_RECORDS_ARRAY_KEY)
    }
}

impl TomlCodec {
    /// Creates a codec storing records under `records_array_key`.
    #[must_use]
    pub fn new(records_array_key: impl Into<String>) -> Self {
        Self {
            records_array_key: records_array_key.into(),
        }
    }

    /// Returns the records array key.
    #[must_use]
    pub fn records_array_key(&self) -> &str {
        &self.records_array_key
    }
}

/// Removes `null` entries from maps and arrays, recursively.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        other => other,
    }
}

fn to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(to_json).collect()),
        toml::Value::Table(table) => Value::Object(table_to_map(table)),
    }
}

fn table_to_map(table: toml::Table) -> Map<String, Value> {
    table.into_iter().map(|(k, v)| (k, to_json(v))).collect()
}

fn write_document(root: Value, writer: &mut dyn Write) -> Result<()> {
    let text = toml::to_string_pretty(&strip_nulls(root)).map_err(|e| Error::codec(TOKEN, e))?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::codec(TOKEN, e))
}

fn read_document(reader: &mut dyn Read) -> Result<Map<String, Value>> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|e| Error::codec(TOKEN, e))?;
    let table: toml::Table = toml::from_str(&text).map_err(|e| Error::codec(TOKEN, e))?;
    Ok(table_to_map(table))
}

impl Codec for TomlCodec {
    fn file_extension(&self) -> &str {
        TOKEN
    }

    fn as_collection_codec(&self) -> Option<&dyn CollectionCodec> {
        Some(self)
    }

    fn as_records_codec(&self) -> Option<&dyn RecordsCodec> {
        Some(self)
    }
}

impl CollectionCodec for TomlCodec {
    fn encode_collection(&self, collection: &Collection, writer: &mut dyn Write) -> Result<()> {
        let value = serde_json::to_value(collection).map_err(|e| Error::codec(TOKEN, e))?;
        write_document(value, writer)
    }

    fn decode_collection(&self, reader: &mut dyn Read) -> Result<CollectionMap> {
        let map = read_document(reader)?;
        expect_map(TOKEN, Value::Object(map))
    }
}

impl RecordsCodec for TomlCodec {
    fn encode_records(
        &self,
        _collection: &Collection,
        records: &[Record],
        writer: &mut dyn Write,
    ) -> Result<()> {
        let maps: Vec<Value> = records
            .iter()
            .map(|r| Value::Object(record_to_map(r)))
            .collect();
        let mut root = Map::with_capacity(1);
        root.insert(self.records_array_key.clone(), Value::Array(maps));
        write_document(Value::Object(root), writer)
    }

    fn decode_records(
        &self,
        collection: &Arc<Collection>,
        reader: &mut dyn Read,
    ) -> Result<Vec<Record>> {
        let mut document = read_document(reader)?;
        match document.remove(&self.records_array_key) {
            Some(Value::Array(items)) => records_from_values(TOKEN, collection, items),
            Some(other) => Err(Error::codec(
                TOKEN,
                format!(
                    "records array key {:?} holds a {}, not an array",
                    self.records_array_key,
                    super::type_name(&other)
                ),
            )),
            None => Err(Error::codec(
                TOKEN,
                format!(
                    "toml records array key {:?} does not exist",
                    self.records_array_key
                ),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, FieldKind};
    use serde_json::json;
    use std::io::Cursor;

    fn notes() -> Arc<Collection> {
        Arc::new(
            Collection::new_base("notes")
                .with_field(Field::new("body", FieldKind::Text))
                .with_field(Field::new("score", FieldKind::Number))
                .with_field(Field::new("extra", FieldKind::Json)),
        )
    }

    #[test]
    fn test_records_wrapped_under_key() {
        let collection = notes();
        let mut record = Record::new(Arc::clone(&collection));
        record.set_id("n1");
        record.set("body", json!("text"));
        record.set("score", json!(1.5));

        let codec = TomlCodec::new("rows");
        let mut out = Vec::new();
        codec
            .encode_records(&collection, std::slice::from_ref(&record), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("[[rows]]"), "{text}");
        assert!(!text.contains("extra"), "null json field dropped: {text}");

        let decoded = codec
            .decode_records(&collection, &mut Cursor::new(text))
            .unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].export_map(), record.export_map());
    }

    #[test]
    fn test_missing_array_key_is_error() {
        let err = TomlCodec::default()
            .decode_records(&notes(), &mut Cursor::new("other = []\n"))
            .unwrap_err();
        assert!(err.to_string().contains("\"records\" does not exist"));
    }

    #[test]
    fn test_collection_round_trip() {
        let codec = TomlCodec::default();
        let collection = Collection::new_auth("users");
        let mut out = Vec::new();
        codec.encode_collection(&collection, &mut out).unwrap();

        let map = codec
            .decode_collection(&mut Cursor::new(out))
            .unwrap();
        let back: Collection = serde_json::from_value(Value::Object(map)).unwrap();
        assert_eq!(back, collection);
    }

    #[test]
    fn test_datetime_values_decode_as_strings() {
        let map = read_document(&mut Cursor::new("when = 2024-01-02T03:04:05Z\n")).unwrap();
        assert_eq!(map["when"], json!("2024-01-02T03:04:05Z"));
    }
}
