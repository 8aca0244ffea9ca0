//! Collection schemas.

use super::datetime::DateTime;
use super::field::{Field, FieldKind};
use crate::security::new_record_id;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Primary key field present on every collection.
pub const FIELD_ID: &str = "id";
/// Auth collection login email.
pub const FIELD_EMAIL: &str = "email";
/// Auth collection email visibility flag.
pub const FIELD_EMAIL_VISIBILITY: &str = "emailVisibility";
/// Auth collection verified flag.
pub const FIELD_VERIFIED: &str = "verified";
/// Auth collection password (stored hashed).
pub const FIELD_PASSWORD: &str = "password";
/// Auth collection session-signing token key.
pub const FIELD_TOKEN_KEY: &str = "tokenKey";

/// Collection and field names.
static NAME_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").ok());

fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.as_ref().is_some_and(|re| re.is_match(name))
}

/// Collection kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Plain collection with stored rows.
    #[default]
    Base,
    /// Read-only collection backed by a query; has no stored rows.
    View,
    /// Collection of accounts with built-in auth fields.
    Auth,
}

impl CollectionKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::View => "view",
            Self::Auth => "auth",
        }
    }
}

/// Federated login (OAuth2) configuration of an auth collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2Config {
    /// Whether OAuth2 login is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Configured providers, including their client secrets.
    #[serde(default)]
    pub providers: Vec<OAuth2Provider>,
}

impl OAuth2Config {
    /// Returns whether the config carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.enabled && self.providers.is_empty()
    }
}

/// One OAuth2 provider entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2Provider {
    /// Provider name (e.g. `google`).
    pub name: String,
    /// OAuth2 client id.
    #[serde(default)]
    pub client_id: String,
    /// OAuth2 client secret.
    #[serde(default)]
    pub client_secret: String,
}

/// A named schema governing a class of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Stable identifier.
    #[serde(default)]
    pub id: String,
    /// Unique name; also the export file stem.
    pub name: String,
    /// Collection kind.
    #[serde(rename = "type", default)]
    pub kind: CollectionKind,
    /// Whether the collection is managed by the store itself.
    #[serde(default)]
    pub system: bool,
    /// Ordered fields with unique names.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Backing query of a view collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_query: Option<String>,
    /// OAuth2 configuration (auth collections only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2: Option<OAuth2Config>,
    /// Creation time.
    #[serde(default)]
    pub created: DateTime,
    /// Last modification time.
    #[serde(default)]
    pub updated: DateTime,
}

impl Collection {
    fn with_kind(name: impl Into<String>, kind: CollectionKind) -> Self {
        let now = DateTime::now();
        Self {
            id: format!("pbc_{}", new_record_id()),
            name: name.into(),
            kind,
            system: false,
            fields: vec![Field::new(FIELD_ID, FieldKind::Text).required().system()],
            view_query: None,
            oauth2: None,
            created: now,
            updated: now,
        }
    }

    /// Creates a base collection holding only the `id` field.
    #[must_use]
    pub fn new_base(name: impl Into<String>) -> Self {
        Self::with_kind(name, CollectionKind::Base)
    }

    /// Creates a view collection over the given query.
    #[must_use]
    pub fn new_view(name: impl Into<String>, query: impl Into<String>) -> Self {
        let mut collection = Self::with_kind(name, CollectionKind::View);
        collection.view_query = Some(query.into());
        collection
    }

    /// Creates an auth collection with the built-in auth fields.
    #[must_use]
    pub fn new_auth(name: impl Into<String>) -> Self {
        let mut collection = Self::with_kind(name, CollectionKind::Auth);
        collection.fields.extend([
            Field::new(FIELD_PASSWORD, FieldKind::Password)
                .required()
                .hidden()
                .system(),
            Field::new(FIELD_TOKEN_KEY, FieldKind::Text)
                .required()
                .hidden()
                .system(),
            Field::new(FIELD_EMAIL, FieldKind::Email).required().system(),
            Field::new(FIELD_EMAIL_VISIBILITY, FieldKind::Bool).system(),
            Field::new(FIELD_VERIFIED, FieldKind::Bool).system(),
        ]);
        collection.oauth2 = Some(OAuth2Config::default());
        collection
    }

    /// Appends a field.
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the system flag.
    #[must_use]
    pub const fn with_system(mut self, system: bool) -> Self {
        self.system = system;
        self
    }

    /// Returns whether this is an auth collection.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        self.kind == CollectionKind::Auth
    }

    /// Returns whether this is a view collection.
    #[must_use]
    pub fn is_view(&self) -> bool {
        self.kind == CollectionKind::View
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns whether a field is excluded from exported record files.
    ///
    /// Password fields and the auth token key never leave the store.
    #[must_use]
    pub fn is_export_excluded(&self, field: &Field) -> bool {
        matches!(field.kind, FieldKind::Password)
            || (self.is_auth() && field.name == FIELD_TOKEN_KEY)
    }

    /// Names of the fields written to record files, in schema order.
    #[must_use]
    pub fn exported_field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| !self.is_export_excluded(f))
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Checks structural consistency of the schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| Error::Validation {
            collection: self.name.clone(),
            reason,
        };

        if !is_valid_name(&self.name) {
            return Err(fail(format!("invalid collection name {:?}", self.name)));
        }

        let mut seen: Vec<&str> = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if !is_valid_name(&field.name) {
                return Err(fail(format!("invalid field name {:?}", field.name)));
            }
            if seen.contains(&field.name.as_str()) {
                return Err(fail(format!("duplicate field name {:?}", field.name)));
            }
            seen.push(&field.name);
        }

        if self.field(FIELD_ID).is_none() {
            return Err(fail("missing id field".to_string()));
        }

        if self.is_view() && self.view_query.as_deref().is_none_or(str::is_empty) {
            return Err(fail("view collection without a query".to_string()));
        }

        if self.is_auth() {
            for required in [FIELD_PASSWORD, FIELD_TOKEN_KEY, FIELD_EMAIL] {
                if self.field(required).is_none() {
                    return Err(fail(format!("auth collection missing field {required:?}")));
                }
            }
        }

        Ok(())
    }
}
