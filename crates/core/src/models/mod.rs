#![allow(missing_docs)]

//! Shared domain models.

mod crop;
mod farmer;

use chrono::{DateTime, NaiveDate};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

pub use crop::{Area, Crop, CropPayload, CropStatus, CropSummary, HarvestWindow, AREA_UNITS};
pub use farmer::{Farmer, RegistrationPayload};

/// Accept identifiers the backend sends either as strings or as numbers.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(value) => Ok(value),
        Value::Number(value) => Ok(value.to_string()),
        other => Err(de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

/// Optional variant of [`id_string`] used for loosely typed fields such as pincodes.
pub(crate) fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) if value.trim().is_empty() => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(Value::Number(value)) => Ok(Some(value.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Dates arrive either as `YYYY-MM-DD` or as full RFC 3339 timestamps.
pub(crate) fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_date(value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid date '{value}'"))),
    }
}

/// Parse a calendar date from either supported representation.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|stamp| stamp.date_naive())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_timestamp_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 1);
        assert_eq!(parse_date("2024-06-01"), expected);
        assert_eq!(parse_date("2024-06-01T00:00:00.000Z"), expected);
        assert_eq!(parse_date("01/06/2024"), None);
    }
}
