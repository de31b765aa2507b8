//! Date normalization between client, store and native representations.
//!
//! # Responsibility
//! - Convert client date inputs (instant, ISO wrapper, ISO string) into
//!   store-native timestamps before writes.
//! - Convert persisted timestamps back into native instants on reads.
//!
//! # Invariants
//! - Malformed input never fails a write; the field is dropped and a
//!   diagnostic is logged instead.
//! - `from_store_timestamp(to_store_timestamp(d))` equals `d` truncated to
//!   millisecond precision.
//! - Native instants pass through `from_store_timestamp` unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const WRAPPED_DATE_KIND: &str = "Date";
const NANOS_PER_MILLI: i64 = 1_000_000;
const MILLIS_PER_SECOND: i64 = 1_000;

/// Store-native timestamp: whole seconds plus sub-second nanoseconds since
/// the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StoreTimestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl StoreTimestamp {
    /// Captures the current wall-clock time.
    pub fn now() -> Self {
        Self::from_instant(Utc::now())
    }

    /// Builds a timestamp keeping the full instant, time of day included.
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self {
            seconds: instant.timestamp(),
            nanoseconds: instant.timestamp_subsec_nanos(),
        }
    }

    /// Converts back to a native instant at millisecond precision.
    pub fn to_instant(self) -> Option<DateTime<Utc>> {
        from_store_timestamp(StoredDate::Timestamp(self))
    }

    /// JSON shape persisted in store documents.
    pub fn to_value(self) -> Value {
        serde_json::json!({
            "seconds": self.seconds,
            "nanoseconds": self.nanoseconds,
        })
    }
}

/// ISO wrapper produced by JSON serialization of client dates:
/// `{ "__type": "Date", "iso": "2024-05-01T00:00:00.000Z" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedDate {
    #[serde(rename = "__type", alias = "kind")]
    pub kind: String,
    pub iso: String,
}

impl WrappedDate {
    pub fn new(iso: impl Into<String>) -> Self {
        Self {
            kind: WRAPPED_DATE_KIND.to_string(),
            iso: iso.into(),
        }
    }
}

/// Every shape a client may hand in for a date field.
///
/// Deserialization never fails on a date field: shapes that match nothing
/// land in `Unrecognized` and are dropped at normalization time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Wrapped(WrappedDate),
    Instant(DateTime<Utc>),
    Iso(String),
    Unrecognized(Value),
}

impl DateInput {
    /// Resolves the input to a native instant at full precision.
    ///
    /// Returns `None` when the input does not describe a valid instant.
    pub fn to_instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Instant(instant) => Some(*instant),
            Self::Wrapped(wrapped) if wrapped.kind == WRAPPED_DATE_KIND => {
                parse_iso_instant(&wrapped.iso)
            }
            Self::Wrapped(_) => None,
            Self::Iso(text) => parse_iso_instant(text),
            Self::Unrecognized(_) => None,
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            Self::Instant(_) => "instant",
            Self::Wrapped(_) => "wrapped",
            Self::Iso(_) => "iso_string",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

impl From<DateTime<Utc>> for DateInput {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Instant(value)
    }
}

impl From<WrappedDate> for DateInput {
    fn from(value: WrappedDate) -> Self {
        Self::Wrapped(value)
    }
}

impl From<&str> for DateInput {
    fn from(value: &str) -> Self {
        Self::Iso(value.to_string())
    }
}

impl From<String> for DateInput {
    fn from(value: String) -> Self {
        Self::Iso(value)
    }
}

/// Persisted date shapes accepted on the read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredDate {
    Timestamp(StoreTimestamp),
    /// Loose `{seconds, nanoseconds}` pair; nanoseconds are not range-checked.
    Raw { seconds: i64, nanoseconds: i64 },
    Instant(DateTime<Utc>),
}

impl From<StoreTimestamp> for StoredDate {
    fn from(value: StoreTimestamp) -> Self {
        Self::Timestamp(value)
    }
}

impl From<DateTime<Utc>> for StoredDate {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Instant(value)
    }
}

/// Normalizes a client date input into a store timestamp.
///
/// Returns `None` (and logs a warning) when the input is not a valid
/// instant; callers omit the field from the outgoing payload.
pub fn to_store_timestamp(input: &DateInput) -> Option<StoreTimestamp> {
    match input.to_instant() {
        Some(instant) => Some(StoreTimestamp::from_instant(instant)),
        None => {
            warn!(
                "event=date_normalize module=timestamp status=dropped shape={}",
                input.shape()
            );
            None
        }
    }
}

/// Converts a persisted date into a native instant.
///
/// `millis = seconds * 1000 + nanoseconds / 1_000_000`; returns `None` only
/// when the result is outside the representable range.
pub fn from_store_timestamp(value: impl Into<StoredDate>) -> Option<DateTime<Utc>> {
    let (seconds, nanoseconds) = match value.into() {
        StoredDate::Instant(instant) => return Some(instant),
        StoredDate::Timestamp(ts) => (ts.seconds, i64::from(ts.nanoseconds)),
        StoredDate::Raw {
            seconds,
            nanoseconds,
        } => (seconds, nanoseconds),
    };

    let millis = seconds
        .checked_mul(MILLIS_PER_SECOND)?
        .checked_add(nanoseconds / NANOS_PER_MILLI)?;
    DateTime::<Utc>::from_timestamp_millis(millis)
}

/// Reads a persisted JSON date field.
///
/// Accepts a `{seconds, nanoseconds}` object or an RFC 3339 string (an
/// instant that was stored as-is). Anything else is logged and dropped.
pub fn instant_from_field(field: &str, value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::Null => return None,
        Value::Object(map) => match (map.get("seconds"), map.get("nanoseconds")) {
            (Some(seconds), Some(nanoseconds)) => {
                match (json_integer(seconds), json_integer(nanoseconds)) {
                    (Some(seconds), Some(nanoseconds)) => from_store_timestamp(StoredDate::Raw {
                        seconds,
                        nanoseconds,
                    }),
                    _ => None,
                }
            }
            _ => None,
        },
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|instant| instant.with_timezone(&Utc)),
        _ => None,
    };

    if parsed.is_none() {
        warn!(
            "event=date_read module=timestamp status=dropped field={}",
            field
        );
    }
    parsed
}

/// Parses the ISO date strings clients send.
///
/// Strings without an offset are read as UTC; a bare `YYYY-MM-DD` is
/// midnight UTC.
pub fn parse_iso_instant(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(instant.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn json_integer(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_accepts_offsets_and_normalizes_to_utc() {
        let parsed = parse_iso_instant("2024-05-01T02:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 0, 30, 0).unwrap());
    }

    #[test]
    fn parse_reads_date_only_as_utc_midnight() {
        let parsed = parse_iso_instant("2024-05-01").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn parse_reads_offsetless_datetime_as_utc() {
        let parsed = parse_iso_instant("2024-05-01 08:15:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 8, 15, 0).unwrap());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_iso_instant("tomorrow-ish").is_none());
        assert!(parse_iso_instant("2024-13-45").is_none());
        assert!(parse_iso_instant("   ").is_none());
    }

    #[test]
    fn wrapped_date_with_wrong_kind_is_dropped() {
        let input = DateInput::Wrapped(WrappedDate {
            kind: "Timestamp".to_string(),
            iso: "2024-05-01T00:00:00Z".to_string(),
        });
        assert!(to_store_timestamp(&input).is_none());
    }

    #[test]
    fn raw_pair_uses_integer_millisecond_math() {
        let instant = from_store_timestamp(StoredDate::Raw {
            seconds: 1,
            nanoseconds: 999_999_999,
        })
        .unwrap();
        assert_eq!(instant.timestamp_millis(), 1_999);
    }

    #[test]
    fn out_of_range_raw_pair_yields_none() {
        assert!(from_store_timestamp(StoredDate::Raw {
            seconds: i64::MAX,
            nanoseconds: 0,
        })
        .is_none());
    }

    #[test]
    fn field_reader_accepts_object_and_string_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let object = serde_json::json!({ "seconds": expected.timestamp(), "nanoseconds": 0 });
        assert_eq!(instant_from_field("dueDate", &object), Some(expected));

        let string = Value::String("2024-05-01T00:00:00Z".to_string());
        assert_eq!(instant_from_field("dueDate", &string), Some(expected));

        assert_eq!(instant_from_field("dueDate", &Value::Bool(true)), None);
    }

    #[test]
    fn date_input_deserializes_every_client_shape() {
        let wrapped: DateInput =
            serde_json::from_value(serde_json::json!({ "__type": "Date", "iso": "2024-05-01" }))
                .unwrap();
        assert!(matches!(wrapped, DateInput::Wrapped(_)));

        let iso: DateInput = serde_json::from_value(serde_json::json!("not a date")).unwrap();
        assert!(matches!(iso, DateInput::Iso(_)));

        let other: DateInput = serde_json::from_value(serde_json::json!({ "iso": 5 })).unwrap();
        assert!(matches!(other, DateInput::Unrecognized(_)));
        assert!(to_store_timestamp(&other).is_none());
    }
}
