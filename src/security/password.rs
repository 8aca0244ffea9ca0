//! Salted password digests.
//!
//! Stored form: `sha256$<salt>$<hex digest of salt || plain>`.

use super::random::random_string;
use sha2::{Digest, Sha256};

const SCHEME: &str = "sha256";
const SALT_LENGTH: usize = 16;

fn digest(salt: &str, plain: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plain.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hashes a plain-text password with a fresh random salt.
#[must_use]
pub fn hash_password(plain: &str) -> String {
    let salt = random_string(SALT_LENGTH);
    let digest = digest(&salt, plain);
    format!("{SCHEME}${salt}${digest}")
}

/// Checks a plain-text password against a stored hash.
#[must_use]
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(SCHEME), Some(salt), Some(expected)) => digest(salt, plain) == expected,
        _ => false,
    }
}
