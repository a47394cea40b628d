//! Instant normalization.
//!
//! Every instant entering a store passes through [`RawInstant::normalize`]
//! exactly once, at write time. Naive (zone-less) values are read in the
//! host's local zone; zoned values are converted directly.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, SubsecRound, TimeZone,
    Utc,
};

use crate::interfaces::{Result, StorageError};

/// Zoned formats tried after RFC 3339, for offsets written without a colon.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Naive formats accepted in addition to RFC 3339.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// An instant as supplied by a caller, before UTC normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInstant {
    /// Wall-clock time without a zone, interpreted in the host's local zone.
    Naive(NaiveDateTime),
    /// Instant carrying its own offset.
    Zoned(DateTime<FixedOffset>),
}

impl RawInstant {
    /// Convert to UTC.
    ///
    /// Fails with [`StorageError::Validation`] when a naive value names a
    /// local time that does not exist or is ambiguous (DST transitions).
    pub fn normalize(self) -> Result<DateTime<Utc>> {
        match self {
            RawInstant::Zoned(dt) => Ok(dt.with_timezone(&Utc)),
            RawInstant::Naive(naive) => match Local.from_local_datetime(&naive) {
                LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
                LocalResult::Ambiguous(_, _) => Err(StorageError::Validation(format!(
                    "local time {} is ambiguous in the host zone",
                    naive
                ))),
                LocalResult::None => Err(StorageError::Validation(format!(
                    "local time {} does not exist in the host zone",
                    naive
                ))),
            },
        }
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for RawInstant {
    fn from(dt: DateTime<Tz>) -> Self {
        RawInstant::Zoned(dt.fixed_offset())
    }
}

impl From<NaiveDateTime> for RawInstant {
    fn from(naive: NaiveDateTime) -> Self {
        RawInstant::Naive(naive)
    }
}

impl FromStr for RawInstant {
    type Err = StorageError;

    /// Parse an ISO-8601 instant.
    ///
    /// Accepts RFC 3339 (with `Z` or a numeric offset, colon optional), naive
    /// date-times with `T` or space separators, bare dates (midnight, local
    /// zone), and the basic format of each (`20240601T120000Z`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();

        if let Some(extended) = expand_basic(s) {
            return extended.parse();
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(RawInstant::Zoned(dt));
        }

        for format in ZONED_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, format) {
                return Ok(RawInstant::Zoned(dt));
            }
        }

        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(RawInstant::Naive(naive));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(RawInstant::Naive(midnight));
            }
        }

        Err(StorageError::Validation(format!(
            "unparseable instant: {:?}",
            s
        )))
    }
}

impl fmt::Display for RawInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawInstant::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S%.f")),
            RawInstant::Zoned(dt) => write!(f, "{}", dt.to_rfc3339()),
        }
    }
}

/// Rewrite ISO-8601 basic format (`20240601T120000Z`, `20240601`) in the
/// extended form.
fn expand_basic(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let digits = |r: std::ops::Range<usize>| {
        bytes
            .get(r)
            .is_some_and(|part| part.iter().all(u8::is_ascii_digit))
    };

    if !digits(0..8) {
        return None;
    }
    let date = format!("{}-{}-{}", &s[0..4], &s[4..6], &s[6..8]);
    if bytes.len() == 8 {
        return Some(date);
    }
    if !matches!(bytes[8], b'T' | b't') || !digits(9..15) {
        return None;
    }
    Some(format!(
        "{}T{}:{}:{}{}",
        date,
        &s[9..11],
        &s[11..13],
        &s[13..15],
        &s[15..]
    ))
}

/// Drop everything below the second.
pub fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(0)
}
