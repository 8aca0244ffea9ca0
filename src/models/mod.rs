//! Data models for bulkport.
//!
//! Collections, fields and records are transient, in-memory representations
//! built fresh for each invocation, either from the store (export) or from
//! decoded files (import).

mod collection;
mod datetime;
mod field;
mod record;

pub use collection::{
    Collection, CollectionKind, FIELD_EMAIL, FIELD_EMAIL_VISIBILITY, FIELD_ID, FIELD_PASSWORD,
    FIELD_TOKEN_KEY, FIELD_VERIFIED, OAuth2Config, OAuth2Provider,
};
pub use datetime::DateTime;
pub use field::{Field, FieldKind, parse_bool_literal};
pub use record::{PasswordValue, Record};
