//! Range queries and their results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Event, Order, RawInstant};
use crate::interfaces::{Result, StorageError};

/// Range query over the timeline.
///
/// `start` and `end` are inclusive. A cursor from a previous page resumes the
/// scan strictly after the last returned event; it is intersected with the
/// bounds, never substituted for them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeQuery {
    pub start: Option<RawInstant>,
    pub end: Option<RawInstant>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
    pub order: Order,
}

impl RangeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(mut self, start: impl Into<RawInstant>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn end(mut self, end: impl Into<RawInstant>) -> Self {
        self.end = Some(end.into());
        self
    }

    pub fn cursor(mut self, cursor: Option<String>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn desc(self) -> Self {
        self.order(Order::Desc)
    }

    /// Normalize the bounds and validate the limit.
    pub fn resolve(self) -> Result<ResolvedRange> {
        if self.limit == Some(0) {
            return Err(StorageError::Validation(
                "limit must be greater than zero".to_string(),
            ));
        }

        Ok(ResolvedRange {
            start: self.start.map(RawInstant::normalize).transpose()?,
            end: self.end.map(RawInstant::normalize).transpose()?,
            cursor: self.cursor,
            limit: self.limit,
            order: self.order,
        })
    }
}

/// A range query with UTC bounds, ready for a backend to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
    pub order: Order,
}

impl ResolvedRange {
    /// True when `start > end`: nothing can match.
    pub fn is_empty_interval(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }

    /// Package scanned events as a page or plain list.
    ///
    /// A cursor is minted from the last event only when the page is full.
    pub fn finish<F>(&self, events: Vec<Event>, encode_cursor: F) -> Result<RangeResult>
    where
        F: FnOnce(&Event) -> Result<String>,
    {
        let Some(limit) = self.limit else {
            return Ok(RangeResult::List(events));
        };

        let next_cursor = match events.last() {
            Some(last) if events.len() == limit => Some(encode_cursor(last)?),
            _ => None,
        };

        Ok(RangeResult::Page(Page {
            events,
            next_cursor,
        }))
    }
}

/// One page of a paginated range query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub events: Vec<Event>,
    pub next_cursor: Option<String>,
}

/// Result of a range query: a page when a limit was given, else the full list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeResult {
    Page(Page),
    List(Vec<Event>),
}

impl RangeResult {
    pub fn events(&self) -> &[Event] {
        match self {
            RangeResult::Page(page) => &page.events,
            RangeResult::List(events) => events,
        }
    }

    pub fn into_events(self) -> Vec<Event> {
        match self {
            RangeResult::Page(page) => page.events,
            RangeResult::List(events) => events,
        }
    }

    pub fn next_cursor(&self) -> Option<&str> {
        match self {
            RangeResult::Page(page) => page.next_cursor.as_deref(),
            RangeResult::List(_) => None,
        }
    }

    /// Unwrap a paginated result.
    pub fn into_page(self) -> Option<Page> {
        match self {
            RangeResult::Page(page) => Some(page),
            RangeResult::List(_) => None,
        }
    }
}
