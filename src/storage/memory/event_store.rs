//! In-memory EventStore implementation.

use std::collections::{BTreeSet, HashMap};
use std::ops::Bound;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cursor::{self, CursorCodec};
use crate::model::{
    Event, EventId, EventPatch, IdGenerator, Order, OrderingKey, RangeQuery, RangeResult,
    RawInstant, ResolvedRange,
};
use crate::storage::{EventStore, Result, StorageError};

/// Cursor codec for the memory backend.
///
/// The position is the ordering key itself, reusable directly as a B-tree
/// bound. The instant is kept at nanosecond precision.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCursor;

impl MemoryCursor {
    const TAG: &'static str = "m";
}

impl CursorCodec for MemoryCursor {
    type Position = OrderingKey;

    fn encode(&self, key: &OrderingKey) -> String {
        cursor::seal(Self::TAG, &cursor::key_body(key))
    }

    fn decode(&self, token: &str) -> Result<OrderingKey> {
        let body = cursor::open(Self::TAG, token)?;
        cursor::parse_key(token, &body)
    }
}

fn key(at: DateTime<Utc>, id: u64) -> OrderingKey {
    OrderingKey::new(at, EventId::Seq(id))
}

fn seq_of(key: &OrderingKey) -> Option<u64> {
    key.id.as_seq()
}

pub(super) struct StoredEvent {
    pub(super) at: DateTime<Utc>,
    data: String,
}

/// Primary mapping, ordering index and identifier source.
///
/// Only `place` and `remove` touch `events` and `index`, and both keep the
/// two in agreement: every live id has exactly one entry in each.
pub(super) struct Timeline {
    ids: IdGenerator,
    pub(super) events: HashMap<u64, StoredEvent>,
    pub(super) index: BTreeSet<OrderingKey>,
}

impl Timeline {
    fn new(seed: u64) -> Self {
        Self {
            ids: IdGenerator::new(seed),
            events: HashMap::new(),
            index: BTreeSet::new(),
        }
    }

    fn event(&self, id: u64) -> Option<Event> {
        self.events.get(&id).map(|stored| Event {
            id: EventId::Seq(id),
            at: stored.at,
            data: stored.data.clone(),
        })
    }

    /// Insert or overwrite an event, moving its index entry if `at` changed.
    fn place(&mut self, id: u64, at: DateTime<Utc>, data: String) -> Event {
        if let Some(previous) = self.events.insert(id, StoredEvent { at, data: data.clone() }) {
            if previous.at != at {
                self.index.remove(&key(previous.at, id));
            }
        }
        self.index.insert(key(at, id));

        Event {
            id: EventId::Seq(id),
            at,
            data,
        }
    }

    fn remove(&mut self, id: u64) -> Option<StoredEvent> {
        let stored = self.events.remove(&id)?;
        self.index.remove(&key(stored.at, id));
        Some(stored)
    }

    fn clear(&mut self) {
        self.events.clear();
        self.index.clear();
        self.ids.reset();
    }

    fn scan(&self, range: &ResolvedRange, after: Option<OrderingKey>) -> Vec<u64> {
        let limit = range.limit.unwrap_or(usize::MAX);
        match range.order {
            Order::Asc => self.scan_asc(range, after, limit),
            Order::Desc => self.scan_desc(range, after, limit),
        }
    }

    fn scan_asc(&self, range: &ResolvedRange, after: Option<OrderingKey>, limit: usize) -> Vec<u64> {
        let from = range.start.map(|start| key(start, u64::MIN));
        let lower = match (from, after) {
            (Some(from), Some(after)) if after >= from => Bound::Excluded(after),
            (Some(from), _) => Bound::Included(from),
            (None, Some(after)) => Bound::Excluded(after),
            (None, None) => Bound::Unbounded,
        };

        self.index
            .range((lower, Bound::Unbounded))
            .take_while(|entry| range.end.map_or(true, |end| entry.at <= end))
            .filter_map(seq_of)
            .take(limit)
            .collect()
    }

    /// Walk instants from newest to oldest, emitting each instant's ids in
    /// ascending order.
    fn scan_desc(&self, range: &ResolvedRange, after: Option<OrderingKey>, limit: usize) -> Vec<u64> {
        let newest = match range.end {
            Some(end) => self.index.range(..=key(end, u64::MAX)).next_back(),
            None => self.index.iter().next_back(),
        };

        // (instant to visit, smallest id allowed at that instant)
        let mut next = newest.map(|entry| (entry.at, u64::MIN));
        if let Some(after) = after {
            if range.end.map_or(true, |end| after.at <= end) {
                next = match seq_of(&after).and_then(|id| id.checked_add(1)) {
                    Some(min_id) => Some((after.at, min_id)),
                    None => self.instant_before(after.at),
                };
            }
        }

        let mut ids = Vec::new();
        while let Some((at, min_id)) = next {
            if range.start.is_some_and(|start| at < start) {
                break;
            }
            for id in self
                .index
                .range(key(at, min_id)..=key(at, u64::MAX))
                .filter_map(seq_of)
            {
                ids.push(id);
                if ids.len() == limit {
                    return ids;
                }
            }
            next = self.instant_before(at);
        }
        ids
    }

    fn instant_before(&self, at: DateTime<Utc>) -> Option<(DateTime<Utc>, u64)> {
        self.index
            .range(..key(at, u64::MIN))
            .next_back()
            .map(|entry| (entry.at, u64::MIN))
    }
}

/// In-process event store.
///
/// All state sits behind one `RwLock`: mutations hold the write lock across
/// the map, the index and the identifier generator; range scans share the
/// read lock with each other.
pub struct MemoryEventStore {
    pub(super) timeline: RwLock<Timeline>,
    codec: MemoryCursor,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::with_seed(1)
    }

    /// Create a store whose first identifier is `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            timeline: RwLock::new(Timeline::new(seed)),
            codec: MemoryCursor,
        }
    }

    pub async fn len(&self) -> usize {
        self.timeline.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn seq(id: &EventId) -> Result<u64> {
        id.as_seq().ok_or_else(|| StorageError::NotFound(id.clone()))
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn create(&self, at: RawInstant, data: String) -> Result<Event> {
        let at = at.normalize()?;

        let mut timeline = self.timeline.write().await;
        let id = timeline.ids.next_id();
        let event = timeline.place(id, at, data);

        debug!(id, at = %event.at, "Stored event in memory");
        Ok(event)
    }

    async fn get(&self, id: &EventId) -> Result<Event> {
        let seq = Self::seq(id)?;
        self.timeline
            .read()
            .await
            .event(seq)
            .ok_or_else(|| StorageError::NotFound(id.clone()))
    }

    async fn update(&self, id: &EventId, patch: EventPatch) -> Result<Event> {
        let seq = Self::seq(id)?;
        let new_at = patch.at.map(RawInstant::normalize).transpose()?;

        let mut timeline = self.timeline.write().await;
        let current = timeline
            .event(seq)
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;

        let at = new_at.unwrap_or(current.at);
        let data = patch.data.unwrap_or(current.data);
        let event = timeline.place(seq, at, data);

        debug!(id = seq, at = %event.at, relocated = at != current.at, "Updated event in memory");
        Ok(event)
    }

    async fn delete(&self, id: &EventId) -> Result<()> {
        let seq = Self::seq(id)?;
        self.timeline
            .write()
            .await
            .remove(seq)
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;

        debug!(id = seq, "Deleted event from memory");
        Ok(())
    }

    async fn range(&self, query: RangeQuery) -> Result<RangeResult> {
        let range = query.resolve()?;
        let after = range
            .cursor
            .as_deref()
            .map(|token| self.codec.decode(token))
            .transpose()?;

        let events = if range.is_empty_interval() {
            Vec::new()
        } else {
            let timeline = self.timeline.read().await;
            timeline
                .scan(&range, after)
                .into_iter()
                .filter_map(|id| timeline.event(id))
                .collect()
        };

        range.finish(events, |last| Ok(self.codec.encode(&OrderingKey::of(last))))
    }

    async fn clear(&self) -> Result<()> {
        self.timeline.write().await.clear();
        debug!("Cleared memory event store");
        Ok(())
    }
}
