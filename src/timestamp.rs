//! UTC instants backed by `chrono`.
//!
//! Parsing accepts RFC 3339 (`Z` or `±HH:MM` offsets); a date-time with no
//! offset is read as UTC. Formatting always produces whole seconds with a `Z`
//! suffix, so generated timestamps are byte-stable.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use thiserror::Error;

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A UTC instant, totally ordered.
///
/// # Examples
///
/// ```
/// use duel_sim::timestamp::Timestamp;
///
/// let a = Timestamp::parse("2025-09-17T02:00:00+02:00").unwrap();
/// let b = Timestamp::parse("2025-09-17T00:00:00Z").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(b.plus_hours(25).unwrap().to_iso8601(), "2025-09-18T01:00:00Z");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

/// Why a timestamp could not be parsed or built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// Input is not an RFC 3339 / ISO-8601 date-time.
    #[error("invalid ISO-8601 timestamp `{input}`: {source}")]
    Parse {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The instant falls outside the representable range.
    #[error("timestamp out of range: {0}")]
    OutOfRange(String),
}

impl Timestamp {
    /// Instant at `secs` seconds after 1970-01-01T00:00:00Z.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if `secs` is beyond what `chrono` can represent.
    pub fn from_epoch_seconds(secs: i64) -> Result<Self, TimestampError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| TimestampError::OutOfRange(format!("{secs} s after the epoch")))
    }

    /// Returns this instant shifted by `hours`.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` if the result is not representable.
    pub fn plus_hours(self, hours: i64) -> Result<Self, TimestampError> {
        TimeDelta::try_hours(hours)
            .and_then(|delta| self.0.checked_add_signed(delta))
            .map(Self)
            .ok_or_else(|| TimestampError::OutOfRange(format!("{self} + {hours} h")))
    }

    /// Formats as `YYYY-MM-DDTHH:MM:SSZ`. Sub-second precision is dropped.
    pub fn to_iso8601(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Parses an ISO-8601 date-time.
    ///
    /// # Errors
    ///
    /// Returns `Parse` with the RFC 3339 parser's reason.
    pub fn parse(s: &str) -> Result<Self, TimestampError> {
        match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Ok(Self(dt.with_timezone(&Utc))),
            Err(source) => NaiveDateTime::parse_from_str(s, NAIVE_FORMAT)
                .map(|naive| Self(naive.and_utc()))
                .map_err(|_| TimestampError::Parse {
                    input: s.to_string(),
                    source,
                }),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}
