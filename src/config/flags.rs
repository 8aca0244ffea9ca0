//! Tri-state override flags.

use crate::Error;
use crate::models::parse_bool_literal;
use std::fmt;
use std::str::FromStr;

/// A boolean override that may be left unset.
///
/// `Unset` means "keep whatever the data says".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    /// Force `true`.
    True,
    /// Force `false`.
    False,
    /// Do not override.
    #[default]
    Unset,
}

impl TriState {
    /// Returns the forced value, if any.
    #[must_use]
    pub const fn value(self) -> Option<bool> {
        match self {
            Self::True => Some(true),
            Self::False => Some(false),
            Self::Unset => None,
        }
    }

    /// Returns `true` unless the flag is `Unset`.
    #[must_use]
    pub const fn is_set(self) -> bool {
        !matches!(self, Self::Unset)
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Unset, Self::from)
    }
}

impl FromStr for TriState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_bool_literal(s)
            .map(Self::from)
            .ok_or_else(|| Error::InvalidInput(format!("invalid boolean value {s:?}")))
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::True => "true",
            Self::False => "false",
            Self::Unset => "unset",
        };
        f.write_str(s)
    }
}
