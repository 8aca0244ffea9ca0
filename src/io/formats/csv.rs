//! CSV codec (records only).
//!
//! The header row lists the exported field names in schema order. Strings are
//! written verbatim; every other value is written as JSON text. Values of
//! `json` fields are always JSON text, strings included, so `"42"` stays a
//! string. A `null` is written as the two character literal `""`, which
//! decodes back to `null`; an empty string in a `json` field therefore reads
//! back as `null`.

use crate::io::traits::{Codec, RecordsCodec};
use crate::models::{Collection, DateTime, FieldKind, Record};
use crate::{Error, Result};
use serde_json::Value;
use std::io::{Read, Write};
use std::sync::Arc;

/// Token and file extension.
pub const TOKEN: &str = "csv";

/// Cell literal standing for `null`.
pub const NULL_SENTINEL: &str = "\"\"";

/// CSV records codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvCodec {
    delimiter: u8,
}

impl Default for CsvCodec {
    fn default() -> Self {
        Self::new(b',')
    }
}

impl CsvCodec {
    /// Creates a codec using the given single-byte delimiter.
    #[must_use]
    pub const fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Returns the delimiter.
    #[must_use]
    pub const fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

fn encode_cell(kind: Option<&FieldKind>, value: &Value) -> Result<String> {
    match (kind, value) {
        (_, Value::Null) => Ok(NULL_SENTINEL.to_string()),
        (Some(FieldKind::Json), json) => {
            serde_json::to_string(json).map_err(|e| Error::codec(TOKEN, e))
        },
        (_, Value::String(s)) => Ok(s.clone()),
        (_, other) => serde_json::to_string(other).map_err(|e| Error::codec(TOKEN, e)),
    }
}

/// Converts one raw cell into a value for `kind`.
///
/// Returns `None` when the cell should leave the field at its default.
fn decode_cell(name: &str, kind: &FieldKind, raw: &str) -> Result<Option<Value>> {
    if raw == NULL_SENTINEL {
        return Ok(Some(Value::Null));
    }

    match kind {
        FieldKind::Json if raw.is_empty() => Ok(Some(Value::Null)),
        FieldKind::Json => serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| Error::codec(TOKEN, format!("field {name:?}: invalid json {raw:?}: {e}"))),
        FieldKind::Date | FieldKind::Autodate { .. } => Ok(DateTime::parse(raw)
            .ok()
            .map(|date| Value::String(date.to_string()))),
        _ => Ok(Some(Value::String(raw.to_string()))),
    }
}

impl Codec for CsvCodec {
    fn file_extension(&self) -> &str {
        TOKEN
    }

    fn as_records_codec(&self) -> Option<&dyn RecordsCodec> {
        Some(self)
    }
}

impl RecordsCodec for CsvCodec {
    fn encode_records(
        &self,
        collection: &Collection,
        records: &[Record],
        writer: &mut dyn Write,
    ) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .from_writer(writer);

        let headers = collection.exported_field_names();
        csv_writer
            .write_record(&headers)
            .map_err(|e| Error::codec(TOKEN, e))?;

        for record in records {
            let row = headers
                .iter()
                .map(|name| {
                    let kind = collection.field(name).map(|f| &f.kind);
                    encode_cell(kind, record.get(name).unwrap_or(&Value::Null))
                })
                .collect::<Result<Vec<_>>>()?;
            csv_writer
                .write_record(&row)
                .map_err(|e| Error::codec(TOKEN, e))?;
        }

        csv_writer.flush().map_err(|e| Error::codec(TOKEN, e))
    }

    fn decode_records(
        &self,
        collection: &Arc<Collection>,
        reader: &mut dyn Read,
    ) -> Result<Vec<Record>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| Error::codec(TOKEN, e))?
            .clone();

        // Resolve header names once; unknown columns map to None.
        let columns: Vec<Option<(&str, &FieldKind)>> = headers
            .iter()
            .map(|name| collection.field(name).map(|f| (f.name.as_str(), &f.kind)))
            .collect();

        let mut records = Vec::new();
        for row in csv_reader.records() {
            let row = row.map_err(|e| Error::codec(TOKEN, e))?;
            let mut record = Record::new(Arc::clone(collection));
            for (column, raw) in columns.iter().zip(row.iter()) {
                let Some((name, kind)) = column else {
                    continue;
                };
                if let Some(value) = decode_cell(name, kind, raw)? {
                    record.set(name, value);
                }
            }
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FIELD_EMAIL, FIELD_VERIFIED, Field};
    use serde_json::json;
    use std::io::Cursor;

    fn articles() -> Arc<Collection> {
        Arc::new(
            Collection::new_base("articles")
                .with_field(Field::new("title", FieldKind::Text))
                .with_field(Field::new("views", FieldKind::Number))
                .with_field(Field::new("meta", FieldKind::Json))
                .with_field(Field::new("published", FieldKind::Date))
                .with_field(Field::new(
                    "tags",
                    FieldKind::Select {
                        values: Vec::new(),
                        max_select: 3,
                    },
                )),
        )
    }

    fn encode(codec: &CsvCodec, collection: &Collection, records: &[Record]) -> String {
        let mut out = Vec::new();
        codec.encode_records(collection, records, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_only_for_empty_set() {
        let text = encode(&CsvCodec::default(), &articles(), &[]);
        assert_eq!(text, "id,title,views,meta,published,tags\n");
    }

    #[test]
    fn test_round_trip_typed_values() {
        let collection = articles();
        let mut record = Record::new(Arc::clone(&collection));
        record.set_id("a1");
        record.set("title", json!("Hello, world"));
        record.set("views", json!(42));
        record.set("meta", json!({"k": [1, 2]}));
        record.set("published", json!("2024-05-06T07:08:09Z"));
        record.set("tags", json!(["x", "y"]));

        let codec = CsvCodec::default();
        let text = encode(&codec, &collection, std::slice::from_ref(&record));
        let decoded = codec
            .decode_records(&collection, &mut Cursor::new(text))
            .unwrap();

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].export_map(), record.export_map());
    }

    #[test]
    fn test_null_sentinel_round_trips() {
        let collection = articles();
        let mut record = Record::new(Arc::clone(&collection));
        record.set_id("a1");
        assert_eq!(record.get("meta"), Some(&Value::Null));

        let codec = CsvCodec::default();
        let text = encode(&codec, &collection, std::slice::from_ref(&record));
        assert!(text.contains("\"\"\"\"\"\""), "{text}");

        let decoded = codec
            .decode_records(&collection, &mut Cursor::new(text))
            .unwrap();
        assert_eq!(decoded[0].get("meta"), Some(&Value::Null));
    }

    #[test]
    fn test_json_strings_stay_strings() {
        let collection = articles();
        let codec = CsvCodec::default();

        for meta in [json!("42"), json!("true"), json!("[1]"), json!("null"), json!("plain")] {
            let mut record = Record::new(Arc::clone(&collection));
            record.set_id("a1");
            record.set("meta", meta.clone());

            let text = encode(&codec, &collection, std::slice::from_ref(&record));
            let decoded = codec
                .decode_records(&collection, &mut Cursor::new(text))
                .unwrap();
            assert_eq!(decoded[0].get("meta"), Some(&meta));
        }
    }

    #[test]
    fn test_invalid_json_cell_rejected() {
        let collection = articles();
        let input = "id,meta\nr1,{not json\n";
        let err = CsvCodec::default()
            .decode_records(&collection, &mut Cursor::new(input))
            .unwrap_err();
        assert!(err.to_string().contains("\"meta\""), "{err}");
    }

    #[test]
    fn test_unknown_columns_and_bad_dates_skipped() {
        let collection = articles();
        let input = "id,ghost,published,views\nr1,boo,not-a-date,7\n";
        let decoded = CsvCodec::default()
            .decode_records(&collection, &mut Cursor::new(input))
            .unwrap();

        assert_eq!(decoded[0].id(), "r1");
        assert!(decoded[0].get("ghost").is_none());
        assert_eq!(decoded[0].get("published"), Some(&json!("")));
        assert_eq!(decoded[0].get("views"), Some(&json!(7.0)));
    }

    #[test]
    fn test_custom_delimiter() {
        let collection = articles();
        let mut record = Record::new(Arc::clone(&collection));
        record.set_id("a1");
        record.set("title", json!("semi;colon"));

        let codec = CsvCodec::new(b';');
        let text = encode(&codec, &collection, std::slice::from_ref(&record));
        assert!(text.starts_with("id;title;views"));

        let decoded = codec
            .decode_records(&collection, &mut Cursor::new(text))
            .unwrap();
        assert_eq!(decoded[0].get_string("title"), "semi;colon");
    }

    #[test]
    fn test_auth_secrets_not_in_header() {
        let users = Arc::new(Collection::new_auth("users"));
        let mut record = Record::new(Arc::clone(&users));
        record.set_id("u1");
        record.set(FIELD_EMAIL, json!("a@example.com"));
        record.set_password("pw");
        record.set_verified(true);

        let text = encode(&CsvCodec::default(), &users, &[record]);
        let header = text.lines().next().unwrap();
        assert_eq!(header, "id,email,emailVisibility,verified");
        assert!(!text.contains("sha256$"));

        let decoded = CsvCodec::default()
            .decode_records(&users, &mut Cursor::new(text))
            .unwrap();
        assert!(decoded[0].get_bool(FIELD_VERIFIED));
    }
}
