//! Security helpers.
//!
//! Random identifiers, token keys and password hashing. Auth secrets are never
//! carried through export files, so every import regenerates them here.

mod password;
mod random;

pub use password::{hash_password, verify_password};
pub use random::{
    ALPHANUMERIC, ID_ALPHABET, ID_LENGTH, new_record_id, random_string, random_string_by_charset,
};
