//! Property-based tests for codecs and identifiers.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Every records codec reproduces the exported field values
//! - Collection schemas survive every collection codec
//! - Generated record ids have the expected shape
//! - Timestamps survive their textual form
//! - Tri-state literals roundtrip through display and parse

// Property tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use bulkport::io::safety::backup_name;
use bulkport::models::{Collection, DateTime, Field, FieldKind, Record, parse_bool_literal};
use bulkport::security::{ID_LENGTH, new_record_id};
use bulkport::{CodecRegistry, TriState};
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

fn notes() -> Arc<Collection> {
    Arc::new(
        Collection::new_base("notes")
            .with_field(Field::new("title", FieldKind::Text))
            .with_field(Field::new("score", FieldKind::Number))
            .with_field(Field::new("pinned", FieldKind::Bool))
            .with_field(Field::new("meta", FieldKind::Json))
            .with_field(Field::new(
                "labels",
                FieldKind::Select {
                    values: Vec::new(),
                    max_select: 5,
                },
            )),
    )
}

/// Text without the CSV null sentinel and without TOML-hostile control bytes.
fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ,.;:!?'\n-]{0,40}"
}

/// Values of a `json` field, including strings that are themselves valid JSON.
fn meta() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z0-9 \\[\\]{}:,\"]{1,20}".prop_map(Value::String),
        prop::sample::select(vec!["42", "true", "null", "[1]"]).prop_map(|s| json!(s)),
    ]
}

type NoteRow = (String, i32, bool, Vec<String>, Value);

fn note_record() -> impl Strategy<Value = NoteRow> {
    (
        text(),
        -1_000_000i32..1_000_000,
        any::<bool>(),
        prop::collection::btree_set("[a-z]{1,8}", 0..4).prop_map(|s| s.into_iter().collect()),
        meta(),
    )
}

fn build(collection: &Arc<Collection>, rows: &[NoteRow]) -> Vec<Record> {
    rows.iter()
        .map(|(title, score, pinned, labels, meta)| {
            let mut record = Record::new(Arc::clone(collection));
            record.set_id(new_record_id());
            record.set("title", json!(title));
            record.set("score", json!(score));
            record.set("pinned", json!(pinned));
            record.set("labels", json!(labels));
            record.set("meta", meta.clone());
            record
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: encode then decode preserves exported values for every records codec.
    #[test]
    fn prop_records_codecs_preserve_values(rows in prop::collection::vec(note_record(), 0..6)) {
        let registry = CodecRegistry::with_defaults();
        let collection = notes();
        let records = build(&collection, &rows);
        let expected: Vec<_> = records.iter().map(Record::export_map).collect();

        for token in ["csv", "json", "yml", "toml"] {
            let (_, codec) = registry.records_codec(token).unwrap();
            let mut buf = Vec::new();
            codec.encode_records(&collection, &records, &mut buf).unwrap();
            let decoded = codec.decode_records(&collection, &mut buf.as_slice()).unwrap();
            let actual: Vec<_> = decoded.iter().map(Record::export_map).collect();
            prop_assert_eq!(&actual, &expected, "codec {}", token);
        }
    }

    /// Property: collection schemas decode to the same collection.
    #[test]
    fn prop_collection_codecs_preserve_schema(
        name in "[a-z][a-z0-9_]{0,15}",
        extra in prop::collection::btree_set("[a-z]{3,10}", 0..5),
    ) {
        let registry = CodecRegistry::with_defaults();
        let mut collection = Collection::new_base(name);
        for field in &extra {
            collection = collection.with_field(Field::new(field.clone(), FieldKind::Text));
        }

        for token in ["json", "yml", "toml"] {
            let (_, codec) = registry.collection_codec(token).unwrap();
            let mut buf = Vec::new();
            codec.encode_collection(&collection, &mut buf).unwrap();
            let map = codec.decode_collection(&mut buf.as_slice()).unwrap();
            let decoded: Collection = serde_json::from_value(Value::Object(map)).unwrap();
            prop_assert_eq!(&decoded, &collection, "codec {}", token);
        }
    }

    /// Property: generated ids are 15 lowercase alphanumerics.
    #[test]
    fn prop_record_ids_have_fixed_shape(_seed in any::<u8>()) {
        let id = new_record_id();
        prop_assert_eq!(id.len(), ID_LENGTH);
        prop_assert!(id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    /// Property: a timestamp renders and parses back to itself.
    #[test]
    fn prop_datetime_display_roundtrips(millis in 0i64..4_102_444_800_000) {
        let value = DateTime::from(Utc.timestamp_millis_opt(millis).unwrap());
        let parsed = DateTime::parse(&value.to_string()).unwrap();
        prop_assert_eq!(parsed, value);
    }

    /// Property: tri-state display parses back, except `unset`.
    #[test]
    fn prop_tristate_display_roundtrips(value in any::<bool>()) {
        let state = TriState::from(value);
        let parsed: TriState = state.to_string().parse().unwrap();
        prop_assert_eq!(parsed, state);
        prop_assert_eq!(parsed.value(), Some(value));
    }

    /// Property: anything that is not a known literal is rejected.
    #[test]
    fn prop_bool_literal_rejects_words(s in "[a-z]{2,8}") {
        prop_assume!(!matches!(s.as_str(), "true" | "false"));
        prop_assert_eq!(parse_bool_literal(&s), None);
    }

    /// Property: backup names are snake case with a 14 digit suffix.
    #[test]
    fn prop_backup_name_shape(prefix in "[A-Za-z][A-Za-z ]{0,20}") {
        let name = backup_name(&prefix);
        let (head, stamp) = name.rsplit_once('_').unwrap();
        prop_assert_eq!(stamp.len(), 14);
        prop_assert!(stamp.chars().all(|c| c.is_ascii_digit()));
        prop_assert!(head.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
    }
}
