//! Random string generation.

use rand::RngExt;

/// Lowercase alphanumeric alphabet used for record identifiers.
pub const ID_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz0123456789";

/// Mixed-case alphanumeric alphabet used for passwords and token keys.
pub const ALPHANUMERIC: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of a generated record identifier.
pub const ID_LENGTH: usize = 15;

/// Generates a random string of `length` characters drawn from `charset`.
///
/// Returns an empty string if `charset` is empty.
#[must_use]
pub fn random_string_by_charset(length: usize, charset: &str) -> String {
    let chars: Vec<char> = charset.chars().collect();
    if chars.is_empty() {
        return String::new();
    }

    let mut rng = rand::rng();
    (0..length)
        .map(|_| chars[rng.random_range(0..chars.len())])
        .collect()
}

/// Generates a random alphanumeric string.
#[must_use]
pub fn random_string(length: usize) -> String {
    random_string_by_charset(length, ALPHANUMERIC)
}

/// Generates a new 15 character `[a-z0-9]` record identifier.
#[must_use]
pub fn new_record_id() -> String {
    random_string_by_charset(ID_LENGTH, ID_ALPHABET)
}
