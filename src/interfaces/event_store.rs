//! Event storage interface.

use async_trait::async_trait;

use crate::model::{Event, EventId, EventPatch, RangeQuery, RangeResult, RawInstant};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Event not found: {0}")]
    NotFound(EventId),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StorageError {
    fn from(e: redis::RedisError) -> Self {
        StorageError::BackendUnavailable(format!("redis: {}", e))
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StorageError {
    fn from(e: mongodb::error::Error) -> Self {
        StorageError::BackendUnavailable(format!("mongodb: {}", e))
    }
}

/// Interface for timeline persistence.
///
/// Every backend keeps a primary `id -> event` mapping and a secondary
/// ordering index on `(at, id)`, and serves the same range/pagination
/// contract: ascending scans order by `at` then `id`; descending scans order
/// by `at` descending and still break same-instant ties by ascending `id`.
///
/// Cursors are opaque and backend-owned. A cursor minted by one backend
/// kind is rejected by another with [`StorageError::InvalidCursor`].
///
/// Implementations:
/// - `MemoryEventStore`: in-process B-tree index
/// - `RedisEventStore`: hash per event plus score-ordered sorted sets
/// - `MongoEventStore`: one document per event, compound `(at, _id)` indexes
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Store a new event.
    ///
    /// Normalizes `at` to UTC, assigns a fresh identifier and indexes the
    /// event. Only fails when the instant is invalid or the backend is down.
    async fn create(&self, at: RawInstant, data: String) -> Result<Event>;

    /// Fetch one event.
    async fn get(&self, id: &EventId) -> Result<Event>;

    /// Apply a partial update.
    ///
    /// A changed `at` moves the event in the ordering index as one logical
    /// step: readers never see it at both positions or at neither.
    async fn update(&self, id: &EventId, patch: EventPatch) -> Result<Event>;

    /// Remove an event from both the primary mapping and the index.
    async fn delete(&self, id: &EventId) -> Result<()>;

    /// Scan the timeline.
    ///
    /// Returns [`RangeResult::Page`] when `query.limit` is set, with a
    /// `next_cursor` only if the page came back full; otherwise returns the
    /// whole interval as [`RangeResult::List`].
    async fn range(&self, query: RangeQuery) -> Result<RangeResult>;

    /// Remove every event.
    async fn clear(&self) -> Result<()>;
}
