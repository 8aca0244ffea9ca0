//! Schema fields and per-type value normalisation.

use super::datetime::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named, typed field of a [`super::Collection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name, unique within its collection.
    pub name: String,
    /// Type tag plus type-specific options.
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Whether a non-empty value is required on save.
    #[serde(default)]
    pub required: bool,
    /// Whether the field is hidden from public output.
    #[serde(default)]
    pub hidden: bool,
    /// Whether the field is managed by the store itself.
    #[serde(default)]
    pub system: bool,
}

/// Field type tags with their options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// Plain text.
    Text,
    /// Rich text.
    Editor,
    /// Floating point number.
    Number,
    /// Boolean.
    Bool,
    /// Email address.
    Email,
    /// URL.
    Url,
    /// User supplied date.
    Date,
    /// Date maintained by the store on create and/or update.
    Autodate {
        /// Set when the record is created.
        #[serde(default, rename = "onCreate")]
        on_create: bool,
        /// Set whenever the record is updated.
        #[serde(default, rename = "onUpdate")]
        on_update: bool,
    },
    /// One or more values from a fixed list.
    Select {
        /// Allowed values.
        #[serde(default)]
        values: Vec<String>,
        /// Maximum number of selected values; `<= 1` means single.
        #[serde(default, rename = "maxSelect")]
        max_select: u32,
    },
    /// One or more file names.
    File {
        /// Maximum number of files; `<= 1` means single.
        #[serde(default, rename = "maxSelect")]
        max_select: u32,
    },
    /// One or more record ids of another collection.
    Relation {
        /// Id of the referenced collection.
        #[serde(default, rename = "collectionId")]
        collection_id: String,
        /// Maximum number of related ids; `<= 1` means single.
        #[serde(default, rename = "maxSelect")]
        max_select: u32,
    },
    /// Arbitrary JSON.
    Json,
    /// Password, stored only as a hash.
    Password,
}

impl FieldKind {
    /// Returns the type tag.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Editor => "editor",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Email => "email",
            Self::Url => "url",
            Self::Date => "date",
            Self::Autodate { .. } => "autodate",
            Self::Select { .. } => "select",
            Self::File { .. } => "file",
            Self::Relation { .. } => "relation",
            Self::Json => "json",
            Self::Password => "password",
        }
    }

    /// Returns whether values are date strings.
    #[must_use]
    pub const fn is_date(&self) -> bool {
        matches!(self, Self::Date | Self::Autodate { .. })
    }

    /// Returns the `maxSelect` option for list-like kinds.
    #[must_use]
    pub const fn max_select(&self) -> Option<u32> {
        match self {
            Self::Select { max_select, .. }
            | Self::File { max_select }
            | Self::Relation { max_select, .. } => Some(*max_select),
            _ => None,
        }
    }

    /// Returns whether the kind holds a list of values.
    #[must_use]
    pub const fn is_multiple(&self) -> bool {
        matches!(self.max_select(), Some(n) if n > 1)
    }
}

impl Field {
    /// Creates a new optional, visible, non-system field.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            hidden: false,
            system: false,
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field as hidden.
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Marks the field as system-managed.
    #[must_use]
    pub const fn system(mut self) -> Self {
        self.system = true;
        self
    }

    /// Coerces a loosely typed value into this field's canonical form.
    ///
    /// | Kind | Canonical value |
    /// |------|-----------------|
    /// | text, editor, email, url, password | string (`null` → `""`) |
    /// | number | float (unparsable → `0`) |
    /// | bool | boolean (`"true"`, `"1"`, ... → `true`) |
    /// | date, autodate | canonical date string or `""` |
    /// | select, file, relation | string when single, unique string list when multiple |
    /// | json | unchanged |
    #[must_use]
    pub fn prepare_value(&self, value: Value) -> Value {
        match &self.kind {
            FieldKind::Text
            | FieldKind::Editor
            | FieldKind::Email
            | FieldKind::Url
            | FieldKind::Password => Value::String(to_text(value)),
            FieldKind::Number => Value::from(to_number(&value)),
            FieldKind::Bool => Value::Bool(to_bool(&value)),
            FieldKind::Date | FieldKind::Autodate { .. } => Value::String(to_date(&value)),
            FieldKind::Select { max_select, .. }
            | FieldKind::File { max_select }
            | FieldKind::Relation { max_select, .. } => to_list(value, *max_select),
            FieldKind::Json => value,
        }
    }

    /// Returns whether a prepared value counts as blank for `required` checks.
    #[must_use]
    pub fn is_blank(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Number(n) => matches!(self.kind, FieldKind::Number) && n.as_f64() == Some(0.0),
            Value::Bool(b) => matches!(self.kind, FieldKind::Bool) && !b,
            Value::Object(map) => map.is_empty(),
        }
    }
}

/// Parses a lenient boolean literal.
///
/// Accepts `1`, `t`, `T`, `TRUE`, `true`, `True` and their negative
/// counterparts. Returns `None` for anything else.
#[must_use]
pub fn parse_bool_literal(s: &str) -> Option<bool> {
    match s.trim() {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or_default(),
        Value::Bool(true) => 1.0,
        _ => 0.0,
    }
}

fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => parse_bool_literal(s).unwrap_or(false),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

fn to_date(value: &Value) -> String {
    match value {
        Value::String(s) => DateTime::parse(s).map(|d| d.to_string()).unwrap_or_default(),
        _ => String::new(),
    }
}

fn to_list(value: Value, max_select: u32) -> Value {
    let items: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(to_text).collect(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else if trimmed.starts_with('[') {
                serde_json::from_str::<Vec<Value>>(trimmed)
                    .map(|items| items.into_iter().map(to_text).collect())
                    .unwrap_or_else(|_| vec![s.clone()])
            } else {
                vec![s]
            }
        },
        other => vec![to_text(other)],
    };

    let mut unique: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_empty() && !unique.contains(&item) {
            unique.push(item);
        }
    }

    if max_select <= 1 {
        Value::String(unique.into_iter().next().unwrap_or_default())
    } else {
        Value::Array(unique.into_iter().map(Value::String).collect())
    }
}
