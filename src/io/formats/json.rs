//! JSON codec.

use super::{expect_map, record_to_map, records_from_values};
use crate::io::traits::{Codec, CollectionCodec, CollectionMap, RecordsCodec};
use crate::models::{Collection, Record};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::io::{Read, Write};
use std::sync::Arc;

/// Token and file extension.
pub const TOKEN: &str = "json";

/// JSON codec for collections and records.
///
/// Each payload is written with its own indent string; an empty indent
/// produces compact output. Output always ends with a newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonCodec {
    collection_indent: String,
    records_indent: String,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self::new("\t", "")
    }
}

impl JsonCodec {
    /// Creates a codec with the given indent strings.
    #[must_use]
    pub fn new(collection_indent: impl Into<String>, records_indent: impl Into<String>) -> Self {
        Self {
            collection_indent: collection_indent.into(),
            records_indent: records_indent.into(),
        }
    }

    fn write<T>(indent: &str, value: &T, writer: &mut dyn Write) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        if indent.is_empty() {
            serde_json::to_writer(&mut *writer, value).map_err(|e| Error::codec(TOKEN, e))?;
        } else {
            let formatter = PrettyFormatter::with_indent(indent.as_bytes());
            let mut serializer = Serializer::with_formatter(&mut *writer, formatter);
            value
                .serialize(&mut serializer)
                .map_err(|e| Error::codec(TOKEN, e))?;
        }
        writer.write_all(b"\n").map_err(|e| Error::codec(TOKEN, e))
    }
}

impl Codec for JsonCodec {
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

impl CollectionCodec for JsonCodec {
    fn encode_collection(&self, collection: &Collection, writer: &mut dyn Write) -> Result<()> {
        Self::write(&self.collection_indent, collection, writer)
    }

    fn decode_collection(&self, reader: &mut dyn Read) -> Result<CollectionMap> {
        let value: Value = serde_json::from_reader(reader).map_err(|e| Error::codec(TOKEN, e))?;
        expect_map(TOKEN, value)
    }
}

impl RecordsCodec for JsonCodec {
    fn encode_records(
        &self,
        _collection: &Collection,
        records: &[Record],
        writer: &mut dyn Write,
    ) -> Result<()> {
        let maps: Vec<_> = records.iter().map(record_to_map).collect();
        Self::write(&self.records_indent, &maps, writer)
    }

    fn decode_records(
        &self,
        collection: &Arc<Collection>,
        reader: &mut dyn Read,
    ) -> Result<Vec<Record>> {
        let values: Vec<Value> =
            serde_json::from_reader(reader).map_err(|e| Error::codec(TOKEN, e))?;
        records_from_values(TOKEN, collection, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, FieldKind};
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_collection_uses_tab_indent() {
        let codec = JsonCodec::default();
        let mut out = Vec::new();
        codec
            .encode_collection(&Collection::new_base("posts"), &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("{\n\t\"id\""));
        assert!(text.ends_with("}\n"));

        let map = codec.decode_collection(&mut Cursor::new(text)).unwrap();
        assert_eq!(map["name"], json!("posts"));
        assert_eq!(map["type"], json!("base"));
    }

    #[test]
    fn test_records_compact_by_default() {
        let posts = Arc::new(
            Collection::new_base("posts").with_field(Field::new("title", FieldKind::Text)),
        );
        let mut record = Record::new(Arc::clone(&posts));
        record.set_id("p1");
        record.set("title", json!("Hi"));

        let codec = JsonCodec::default();
        let mut out = Vec::new();
        codec.encode_records(&posts, &[record], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            format!(
                "[{{\"collectionId\":\"{}\",\"collectionName\":\"posts\",\"id\":\"p1\",\"title\":\"Hi\"}}]\n",
                posts.id
            )
        );

        let decoded = codec
            .decode_records(&posts, &mut Cursor::new(text))
            .unwrap();
        assert_eq!(decoded[0].get_string("title"), "Hi");
    }

    #[test]
    fn test_decode_collection_rejects_array() {
        let codec = JsonCodec::default();
        assert!(codec.decode_collection(&mut Cursor::new("[1,2]")).is_err());
        assert!(codec.decode_collection(&mut Cursor::new("{not json")).is_err());
    }
}
