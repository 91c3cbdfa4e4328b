//! Time handling for the SimpleJSON wire protocol
//!
//! The protocol uses three independent encodings:
//!
//! - **Range time**: RFC3339 strings with nanosecond precision, used for the
//!   `range` boundaries of a request and for `time` cells of a table.
//! - **Point time**: signed milliseconds since the Unix epoch, used for
//!   datapoints and annotation records. Sub-millisecond precision is dropped.
//! - **Duration**: human readable strings such as `30s` or `1h30m`, used for
//!   the query `interval`.
//!
//! Each encoding is exposed as a pair of `encode_*`/`decode_*` functions and a
//! serde `with` module for use on wire structs.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::fmt;
use std::fmt::Write as _;
use std::time::Duration;

use crate::error::{SimpleJsonError, SimpleJsonResult};

/// Timestamp representing a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

/// Time range of a request. Both ends are inclusive and forwarded as-is;
/// `from <= to` is not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl Timestamp {
    /// Create from milliseconds since Unix epoch
    pub fn from_millis(millis: i64) -> SimpleJsonResult<Self> {
        match Utc.timestamp_millis_opt(millis) {
            chrono::LocalResult::Single(dt) => Ok(Self(dt)),
            _ => Err(SimpleJsonError::decode(format!(
                "timestamp out of range: {}ms",
                millis
            ))),
        }
    }

    /// Create from seconds since Unix epoch
    pub fn from_secs(secs: i64) -> SimpleJsonResult<Self> {
        match Utc.timestamp_opt(secs, 0) {
            chrono::LocalResult::Single(dt) => Ok(Self(dt)),
            _ => Err(SimpleJsonError::decode(format!(
                "timestamp out of range: {}s",
                secs
            ))),
        }
    }

    /// Create from a DateTime<Utc>
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get milliseconds since Unix epoch
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Get the underlying DateTime<Utc>
    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Drop everything below millisecond precision
    pub fn truncate_to_millis(&self) -> Self {
        Self::from_millis(self.timestamp_millis()).unwrap_or(*self)
    }

    /// Format as RFC3339 in UTC, keeping as many fractional digits as needed
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Parse from an RFC3339 string with any offset
    pub fn from_rfc3339(s: &str) -> SimpleJsonResult<Self> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| SimpleJsonError::decode(format!("invalid time {:?}: {}", s, e)))?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Shift by a signed number of milliseconds
    pub fn add_millis(&self, millis: i64) -> SimpleJsonResult<Self> {
        self.0
            .checked_add_signed(chrono::Duration::milliseconds(millis))
            .map(Self)
            .ok_or_else(|| SimpleJsonError::decode("timestamp overflow"))
    }
}

impl TimeRange {
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {}]", self.from, self.to)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Encode a timestamp as a range time string
pub fn encode_range_time(ts: Timestamp) -> String {
    ts.to_rfc3339()
}

/// Decode a range time string
pub fn decode_range_time(s: &str) -> SimpleJsonResult<Timestamp> {
    Timestamp::from_rfc3339(s)
}

/// Encode a timestamp as milliseconds since the epoch
pub fn encode_point_time(ts: Timestamp) -> i64 {
    ts.timestamp_millis()
}

/// Decode milliseconds since the epoch
pub fn decode_point_time(millis: i64) -> SimpleJsonResult<Timestamp> {
    Timestamp::from_millis(millis)
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

// Largest first; encoding walks this table in order.
const DURATION_UNITS: [(&str, u128); 6] = [
    ("h", 3_600 * NANOS_PER_SEC),
    ("m", 60 * NANOS_PER_SEC),
    ("s", NANOS_PER_SEC),
    ("ms", 1_000_000),
    ("us", 1_000),
    ("ns", 1),
];

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "µs" | "μs" => Some(1_000),
        _ => DURATION_UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos),
    }
}

/// Encode a duration as a sequence of non-zero unit segments, e.g. `1h30m`
pub fn encode_duration(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }

    let mut remaining = duration.as_nanos();
    let mut out = String::new();
    for (unit, nanos) in DURATION_UNITS {
        let count = remaining / nanos;
        if count > 0 {
            let _ = write!(out, "{}{}", count, unit);
            remaining %= nanos;
        }
    }
    out
}

/// Decode a duration string such as `30s`, `1h30m` or `500ms`.
///
/// Magnitudes must be unsigned integers; fractional values are rejected.
pub fn decode_duration(input: &str) -> SimpleJsonResult<Duration> {
    let invalid = |reason: &str| {
        SimpleJsonError::decode(format!("invalid duration {:?}: {}", input, reason))
    };

    if input == "0" {
        return Ok(Duration::ZERO);
    }
    if input.is_empty() {
        return Err(invalid("empty"));
    }

    let mut rest = input;
    let mut total: u128 = 0;
    while !rest.is_empty() {
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_end == 0 {
            return Err(invalid("expected a number"));
        }
        let magnitude: u128 = rest[..digits_end]
            .parse()
            .map_err(|_| invalid("number too large"))?;
        rest = &rest[digits_end..];

        if rest.starts_with('.') {
            return Err(invalid("fractional values are not supported"));
        }

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let nanos = unit_nanos(unit).ok_or_else(|| invalid("unknown unit"))?;
        rest = &rest[unit_end..];

        total = magnitude
            .checked_mul(nanos)
            .and_then(|n| total.checked_add(n))
            .ok_or_else(|| invalid("overflow"))?;
    }

    let secs = u64::try_from(total / NANOS_PER_SEC).map_err(|_| invalid("overflow"))?;
    Ok(Duration::new(secs, (total % NANOS_PER_SEC) as u32))
}

/// Serde adapter for range time strings
pub mod range_time {
    use super::Timestamp;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_range_time(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::decode_range_time(&raw).map_err(D::Error::custom)
    }
}

/// Serde adapter for integer millisecond point times
pub mod point_time {
    use super::Timestamp;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(super::encode_point_time(*ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let millis = i64::deserialize(deserializer)?;
        super::decode_point_time(millis).map_err(D::Error::custom)
    }
}

/// Serde adapter for duration strings
pub mod duration {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::encode_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::decode_duration(&raw).map_err(D::Error::custom)
    }
}
