//! Ordering key, scan direction and identifier generation.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Event, EventId};
use crate::interfaces::StorageError;

/// Composite key `(at, id)` that totally orders events.
///
/// Derived ordering compares `at` first and breaks ties on `id`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderingKey {
    pub at: DateTime<Utc>,
    pub id: EventId,
}

impl OrderingKey {
    pub fn new(at: DateTime<Utc>, id: impl Into<EventId>) -> Self {
        Self { at, id: id.into() }
    }

    pub fn of(event: &Event) -> Self {
        Self {
            at: event.at,
            id: event.id.clone(),
        }
    }
}

/// Scan direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub fn is_desc(self) -> bool {
        matches!(self, Order::Desc)
    }

    /// Compare two keys in scan order.
    ///
    /// Instants follow the direction; equal instants always fall back to
    /// ascending identifier, so a descending scan is not the plain reverse of
    /// an ascending one when instants collide.
    pub fn compare(self, a: &OrderingKey, b: &OrderingKey) -> Ordering {
        let by_instant = match self {
            Order::Asc => a.at.cmp(&b.at),
            Order::Desc => b.at.cmp(&a.at),
        };
        by_instant.then_with(|| a.id.cmp(&b.id))
    }

    /// Sort events into scan order.
    pub fn sort(self, events: &mut [Event]) {
        events.sort_by(|a, b| self.compare(&OrderingKey::of(a), &OrderingKey::of(b)));
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Order::Asc => f.write_str("asc"),
            Order::Desc => f.write_str("desc"),
        }
    }
}

impl FromStr for Order {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Order::Asc),
            "desc" => Ok(Order::Desc),
            other => Err(StorageError::Validation(format!(
                "order must be 'asc' or 'desc', got {:?}",
                other
            ))),
        }
    }
}

/// Strictly increasing identifier source owned by one store instance.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: u64,
    next: u64,
}

impl IdGenerator {
    pub fn new(seed: u64) -> Self {
        Self { seed, next: seed }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Restart from the seed.
    pub fn reset(&mut self) {
        self.next = self.seed;
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}
