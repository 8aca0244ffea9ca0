//! YAML codec.

use super::{expect_map, record_to_map, records_from_values};
use crate::io::traits::{Codec, CollectionCodec, CollectionMap, RecordsCodec};
use crate::models::{Collection, Record};
use crate::{Error, Result};
use serde_json::Value;
use std::io::{Read, Write};
use std::sync::Arc;

/// Token and file extension.
pub const TOKEN: &str = "yml";

/// YAML codec for collections and records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YamlCodec;

impl YamlCodec {
    /// Creates the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Codec for YamlCodec {
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

impl CollectionCodec for YamlCodec {
    fn encode_collection(&self, collection: &Collection, writer: &mut dyn Write) -> Result<()> {
        serde_yaml_ng::to_writer(writer, collection).map_err(|e| Error::codec(TOKEN, e))
    }

    fn decode_collection(&self, reader: &mut dyn Read) -> Result<CollectionMap> {
        let value: Value = serde_yaml_ng::from_reader(reader).map_err(|e| Error::codec(TOKEN, e))?;
        expect_map(TOKEN, value)
    }
}

impl RecordsCodec for YamlCodec {
    fn encode_records(
        &self,
        _collection: &Collection,
        records: &[Record],
        writer: &mut dyn Write,
    ) -> Result<()> {
        let maps: Vec<_> = records.iter().map(record_to_map).collect();
        serde_yaml_ng::to_writer(writer, &maps).map_err(|e| Error::codec(TOKEN, e))
    }

    fn decode_records(
        &self,
        collection: &Arc<Collection>,
        reader: &mut dyn Read,
    ) -> Result<Vec<Record>> {
        let value: Value = serde_yaml_ng::from_reader(reader).map_err(|e| Error::codec(TOKEN, e))?;
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => records_from_values(TOKEN, collection, items),
            other => Err(Error::codec(
                TOKEN,
                format!(
                    "expected a sequence of records, found a {}",
                    super::type_name(&other)
                ),
            )),
        }
    }
}
