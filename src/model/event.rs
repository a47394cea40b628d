//! Event record and identifiers.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RawInstant;

/// Event identifier.
///
/// The memory and Redis stores hand out sequential integers; MongoDB uses
/// the document's ObjectId in hex. On the wire the identifier is either a
/// JSON integer or a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Seq(u64),
    Object(String),
}

impl EventId {
    /// The sequential value, if this is a sequential identifier.
    pub fn as_seq(&self) -> Option<u64> {
        match self {
            EventId::Seq(n) => Some(*n),
            EventId::Object(_) => None,
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Seq(n) => write!(f, "{}", n),
            EventId::Object(s) => f.write_str(s),
        }
    }
}

impl FromStr for EventId {
    type Err = Infallible;

    /// Path segments made only of digits are sequential identifiers; anything
    /// else is kept verbatim for the backend to interpret.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<u64>() {
            Ok(n) => EventId::Seq(n),
            Err(_) => EventId::Object(s.to_string()),
        })
    }
}

impl From<u64> for EventId {
    fn from(n: u64) -> Self {
        EventId::Seq(n)
    }
}

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub at: DateTime<Utc>,
    pub data: String,
}

/// Partial update of an event.
///
/// Each field is independently present or absent; absent fields are left
/// untouched by [`EventStore::update`](crate::interfaces::EventStore::update).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub at: Option<RawInstant>,
    pub data: Option<String>,
}

impl EventPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, at: impl Into<RawInstant>) -> Self {
        self.at = Some(at.into());
        self
    }

    pub fn data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.at.is_none() && self.data.is_none()
    }
}
