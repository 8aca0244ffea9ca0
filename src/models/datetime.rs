//! Zero-able UTC timestamp used by date fields and collection metadata.

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Canonical textual layout, millisecond precision.
const DEFAULT_LAYOUT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

/// Layouts accepted by [`DateTime::parse`] besides RFC 3339.
const PARSE_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S%.fZ", "%Y-%m-%d %H:%M:%S%.f"];

/// A UTC timestamp that may be "zero" (unset).
///
/// Renders as `YYYY-MM-DD HH:MM:SS.mmmZ`, or as an empty string when zero.
/// Serializes to and from that same string form, so it survives every
/// textual codec unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DateTime(Option<chrono::DateTime<Utc>>);

impl DateTime {
    /// The current time, truncated to milliseconds.
    #[must_use]
    pub fn now() -> Self {
        Self(Some(Utc::now().trunc_subsecs(3)))
    }

    /// The zero (unset) timestamp.
    #[must_use]
    pub const fn zero() -> Self {
        Self(None)
    }

    /// Returns whether this is the zero timestamp.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the underlying chrono value, if set.
    #[must_use]
    pub const fn inner(&self) -> Option<chrono::DateTime<Utc>> {
        self.0
    }

    /// Parses a timestamp.
    ///
    /// Accepts the canonical layout, RFC 3339, a space separated layout
    /// without zone and a bare `YYYY-MM-DD` date. An empty string parses to
    /// the zero timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if no layout matches.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(Self::zero());
        }

        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(value) {
            return Ok(Self(Some(dt.with_timezone(&Utc).trunc_subsecs(3))));
        }

        for layout in PARSE_LAYOUTS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, layout) {
                return Ok(Self(Some(naive.and_utc().trunc_subsecs(3))));
            }
        }

        if let Some(midnight) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(Self(Some(midnight.and_utc())));
        }

        Err(Error::InvalidInput(format!("invalid datetime value {value:?}")))
    }
}

impl From<chrono::DateTime<Utc>> for DateTime {
    fn from(value: chrono::DateTime<Utc>) -> Self {
        Self(Some(value.trunc_subsecs(3)))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(dt) => write!(f, "{}", dt.format(DEFAULT_LAYOUT)),
            None => Ok(()),
        }
    }
}

impl Serialize for DateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            Some(s) => Self::parse(&s).map_err(serde::de::Error::custom),
            None => Ok(Self::zero()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_zero_renders_empty() {
        assert_eq!(DateTime::zero().to_string(), "");
        assert!(DateTime::parse("").unwrap().is_zero());
        assert!(DateTime::parse("   ").unwrap().is_zero());
    }

    #[test]
    fn test_canonical_layout_roundtrips() {
        let dt = DateTime::from(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap());
        let text = dt.to_string();
        assert_eq!(text, "2024-03-09 14:05:07.000Z");
        assert_eq!(DateTime::parse(&text).unwrap(), dt);
    }

    #[test]
    fn test_parse_alternative_layouts() {
        let expected = DateTime::from(Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap());
        assert_eq!(DateTime::parse("2024-03-09T14:05:07Z").unwrap(), expected);
        assert_eq!(DateTime::parse("2024-03-09 14:05:07").unwrap(), expected);

        let midnight = DateTime::parse("2024-03-09").unwrap();
        assert_eq!(midnight.to_string(), "2024-03-09 00:00:00.000Z");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(DateTime::parse("yesterday").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let dt = DateTime::parse("2024-03-09 14:05:07.123Z").unwrap();
        let json = serde_json::to_string(&dt).unwrap();
        assert_eq!(json, "\"2024-03-09 14:05:07.123Z\"");
        let back: DateTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dt);

        let zero: DateTime = serde_json::from_str("\"\"").unwrap();
        assert!(zero.is_zero());
        let null: DateTime = serde_json::from_str("null").unwrap();
        assert!(null.is_zero());
    }
}
