//! Typed records bound to a collection schema.

use super::collection::{
    Collection, FIELD_EMAIL_VISIBILITY, FIELD_ID, FIELD_TOKEN_KEY, FIELD_VERIFIED,
};
use super::field::FieldKind;
use crate::security::{hash_password, random_string};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Length of a generated auth token key.
const TOKEN_KEY_LENGTH: usize = 50;

static EMAIL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

static ID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").ok());

fn is_match(pattern: &Lazy<Option<Regex>>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

/// Password sub-value of an auth record.
///
/// `plain` is only populated between [`Record::set_password`] and
/// [`Record::clear_plain_password`]; the store persists `hash` alone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PasswordValue {
    /// Plain-text component.
    pub plain: String,
    /// Stored hash.
    pub hash: String,
}

/// One row of a collection.
#[derive(Debug, Clone)]
pub struct Record {
    collection: Arc<Collection>,
    data: Map<String, Value>,
    password: Option<PasswordValue>,
    is_new: bool,
}

impl Record {
    /// Creates an empty record with every field set to its zero value.
    ///
    /// Auth records start with a fresh token key.
    #[must_use]
    pub fn new(collection: Arc<Collection>) -> Self {
        let data = collection
            .fields
            .iter()
            .filter(|f| !matches!(f.kind, FieldKind::Password))
            .map(|f| (f.name.clone(), f.prepare_value(Value::Null)))
            .collect();

        let mut record = Self {
            collection,
            data,
            password: None,
            is_new: true,
        };
        if record.collection.is_auth() {
            record.refresh_token_key();
        }
        record
    }

    /// The collection this record belongs to.
    #[must_use]
    pub const fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }

    /// Sets every known field from `map`; unknown keys are skipped.
    pub fn load(&mut self, map: Map<String, Value>) {
        for (key, value) in map {
            self.set(&key, value);
        }
    }

    /// Sets a single field, normalising the value to the field type.
    ///
    /// Password fields are hashed. Unknown field names are ignored.
    pub fn set(&mut self, name: &str, value: Value) {
        let Some(field) = self.collection.field(name) else {
            return;
        };

        if matches!(field.kind, FieldKind::Password) {
            let plain = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            if !plain.is_empty() {
                self.set_password(&plain);
            }
            return;
        }

        let prepared = field.prepare_value(value);
        self.data.insert(name.to_string(), prepared);
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Returns a field value as a string slice, or `""`.
    #[must_use]
    pub fn get_string(&self, name: &str) -> &str {
        self.get(name).and_then(Value::as_str).unwrap_or_default()
    }

    /// Returns a field value as a boolean, or `false`.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or_default()
    }

    /// The record identifier (empty until assigned).
    #[must_use]
    pub fn id(&self) -> &str {
        self.get_string(FIELD_ID)
    }

    /// Assigns the record identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.data
            .insert(FIELD_ID.to_string(), Value::String(id.into()));
    }

    /// Whether the next save inserts rather than updates.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.is_new
    }

    /// Forces insert semantics on the next save.
    pub const fn mark_as_new(&mut self) {
        self.is_new = true;
    }

    /// Forces update semantics on the next save.
    pub const fn mark_as_not_new(&mut self) {
        self.is_new = false;
    }

    /// Sets a new password, hashing it immediately.
    pub fn set_password(&mut self, plain: &str) {
        self.password = Some(PasswordValue {
            plain: plain.to_string(),
            hash: hash_password(plain),
        });
    }

    /// Sets an already hashed password.
    pub fn set_password_hash(&mut self, hash: impl Into<String>) {
        self.password = Some(PasswordValue {
            plain: String::new(),
            hash: hash.into(),
        });
    }

    /// The password sub-value, if any.
    #[must_use]
    pub const fn password(&self) -> Option<&PasswordValue> {
        self.password.as_ref()
    }

    /// Drops the plain-text password, keeping the hash.
    pub fn clear_plain_password(&mut self) {
        if let Some(password) = self.password.as_mut() {
            password.plain.clear();
        }
    }

    /// Replaces the auth token key, invalidating previously issued tokens.
    pub fn refresh_token_key(&mut self) {
        self.data.insert(
            FIELD_TOKEN_KEY.to_string(),
            Value::String(random_string(TOKEN_KEY_LENGTH)),
        );
    }

    /// Sets the auth `verified` flag.
    pub fn set_verified(&mut self, verified: bool) {
        self.data
            .insert(FIELD_VERIFIED.to_string(), Value::Bool(verified));
    }

    /// Sets the auth `emailVisibility` flag.
    pub fn set_email_visibility(&mut self, visible: bool) {
        self.data
            .insert(FIELD_EMAIL_VISIBILITY.to_string(), Value::Bool(visible));
    }

    /// All stored field values, including secrets.
    #[must_use]
    pub const fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Field values safe to write to an export file, in schema order.
    ///
    /// Password fields and the auth token key are left out.
    #[must_use]
    pub fn export_map(&self) -> Map<String, Value> {
        self.collection
            .exported_field_names()
            .into_iter()
            .map(|name| {
                let value = self.data.get(name).cloned().unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect()
    }

    /// Checks the record against its collection schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| Error::Validation {
            collection: self.collection.name.clone(),
            reason,
        };

        if self.collection.is_view() {
            return Err(fail("view collections are read-only".to_string()));
        }

        // An empty id is assigned by the store on insert.
        let id = self.id();
        if !id.is_empty() && !is_match(&ID_PATTERN, id) {
            return Err(fail(format!("invalid record id {id:?}")));
        }

        for field in &self.collection.fields {
            if field.name == FIELD_ID {
                continue;
            }
            if matches!(field.kind, FieldKind::Password) {
                let missing = self.password.as_ref().is_none_or(|p| p.hash.is_empty());
                if field.required && missing {
                    return Err(fail(format!("{}: cannot be blank", field.name)));
                }
                continue;
            }

            let value = self.data.get(&field.name).unwrap_or(&Value::Null);
            if field.required && field.is_blank(value) {
                return Err(fail(format!("{}: cannot be blank", field.name)));
            }

            match (&field.kind, value) {
                (FieldKind::Email, Value::String(email))
                    if !email.is_empty() && !is_match(&EMAIL_PATTERN, email) =>
                {
                    return Err(fail(format!("{}: invalid email {email:?}", field.name)));
                },
                (FieldKind::Select { values, .. }, _) if !values.is_empty() => {
                    let chosen: Vec<&str> = match value {
                        Value::String(s) if !s.is_empty() => vec![s.as_str()],
                        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
                        _ => Vec::new(),
                    };
                    if let Some(bad) = chosen.iter().find(|c| !values.iter().any(|v| v == *c)) {
                        return Err(fail(format!(
                            "{}: {bad:?} is not one of {}",
                            field.name,
                            values.join(", ")
                        )));
                    }
                },
                _ => {},
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FIELD_EMAIL, FIELD_PASSWORD, Field};
    use crate::security::verify_password;
    use serde_json::json;

    fn posts() -> Arc<Collection> {
        Arc::new(
            Collection::new_base("posts")
                .with_field(Field::new("title", FieldKind::Text).required())
                .with_field(Field::new(
                    "status",
                    FieldKind::Select {
                        values: vec!["draft".into(), "live".into()],
                        max_select: 1,
                    },
                )),
        )
    }

    #[test]
    fn test_new_record_has_zero_values() {
        let record = Record::new(posts());
        assert!(record.is_new());
        assert_eq!(record.id(), "");
        assert_eq!(record.get("title"), Some(&json!("")));
    }

    #[test]
    fn test_load_skips_unknown_keys() {
        let mut record = Record::new(posts());
        let mut map = Map::new();
        map.insert("title".into(), json!("Hello"));
        map.insert("nope".into(), json!(1));
        map.insert("collectionName".into(), json!("posts"));
        record.load(map);

        assert_eq!(record.get_string("title"), "Hello");
        assert!(record.get("nope").is_none());
        assert!(record.get("collectionName").is_none());
    }

    #[test]
    fn test_validate() {
        let mut record = Record::new(posts());
        record.set_id("abc123");
        assert!(record.validate().is_err(), "title is required");

        record.set("title", json!("Hello"));
        record.validate().unwrap();

        record.set("status", json!("archived"));
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_missing_id() {
        let mut record = Record::new(posts());
        record.set("title", json!("Hello"));
        assert_eq!(record.id(), "");
        record.validate().unwrap();

        record.set_id("not valid!");
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_auth_secrets() {
        let users = Arc::new(Collection::new_auth("users"));
        let mut record = Record::new(users);
        let first_key = record.get_string(FIELD_TOKEN_KEY).to_string();
        assert_eq!(first_key.len(), TOKEN_KEY_LENGTH);

        record.refresh_token_key();
        assert_ne!(record.get_string(FIELD_TOKEN_KEY), first_key);

        record.set(FIELD_PASSWORD, json!("hunter22"));
        let password = record.password().unwrap().clone();
        assert_eq!(password.plain, "hunter22");
        assert!(verify_password("hunter22", &password.hash));

        record.clear_plain_password();
        assert_eq!(record.password().unwrap().plain, "");
        assert_eq!(record.password().unwrap().hash, password.hash);
    }

    #[test]
    fn test_export_map_excludes_secrets() {
        let users = Arc::new(Collection::new_auth("users"));
        let mut record = Record::new(users);
        record.set_id("u1");
        record.set(FIELD_EMAIL, json!("a@example.com"));
        record.set_password("x");
        record.set_verified(true);

        let map = record.export_map();
        assert!(!map.contains_key(FIELD_PASSWORD));
        assert!(!map.contains_key(FIELD_TOKEN_KEY));
        assert_eq!(map[FIELD_VERIFIED], json!(true));
        assert_eq!(map[FIELD_EMAIL], json!("a@example.com"));
    }

    #[test]
    fn test_auth_validate_requires_password_and_email() {
        let users = Arc::new(Collection::new_auth("users"));
        let mut record = Record::new(users);
        record.set_id("u1");
        record.set(FIELD_EMAIL, json!("not-an-email"));
        assert!(record.validate().is_err());

        record.set(FIELD_EMAIL, json!("a@example.com"));
        assert!(record.validate().is_err(), "password missing");

        record.set_password("pw");
        record.validate().unwrap();
    }
}
