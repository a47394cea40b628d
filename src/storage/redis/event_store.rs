//! Redis EventStore implementation.
//!
//! Each event is a hash (`at`, `data`) under `{prefix}:event:{id}`. Two sorted
//! sets index the timeline:
//!
//! - `{prefix}:timeline:asc` scored `secs + frac(id)`
//! - `{prefix}:timeline:desc` scored `-secs + frac(id)`
//!
//! where `frac(id) = (id mod 10^6) / 10^6`. Scanning either set by ascending
//! score visits whole seconds in scan order.
//!
//! The index only sees whole seconds. Range scans read one second at a time
//! and order it by the full instant kept in the hash, so bounds, cursors and
//! same-second ordering are exact. Identifiers that collide modulo 10^6 share
//! a score but are still ordered correctly.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use tracing::{debug, info};

use crate::cursor::{self, CursorCodec};
use crate::model::{
    Event, EventId, EventPatch, Order, OrderingKey, RangeQuery, RangeResult, RawInstant,
    ResolvedRange,
};
use crate::storage::{EventStore, Result, StorageError};

/// Identifiers disambiguated per second by the fractional part of a score.
pub const ID_SLOTS: u64 = 1_000_000;

/// Index entries read per round trip when filling a page.
const SCAN_BATCH: usize = 100;

/// Patch an event only if its hash still exists.
///
/// KEYS: event hash, ascending index, descending index.
/// ARGV: id, new `at` (empty to keep), asc score, desc score, data flag, data.
/// Returns the patched hash, or nil when the event is gone.
const UPDATE_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return false
end
if ARGV[2] ~= '' then
  redis.call('HSET', KEYS[1], 'at', ARGV[2])
  redis.call('ZADD', KEYS[2], ARGV[3], ARGV[1])
  redis.call('ZADD', KEYS[3], ARGV[4], ARGV[1])
end
if ARGV[5] == '1' then
  redis.call('HSET', KEYS[1], 'data', ARGV[6])
end
return redis.call('HGETALL', KEYS[1])
";

fn id_fraction(id: u64) -> f64 {
    (id % ID_SLOTS) as f64 / ID_SLOTS as f64
}

/// Score of an event in the ascending index.
pub fn asc_score(secs: i64, id: u64) -> f64 {
    secs as f64 + id_fraction(id)
}

/// Score of an event in the descending index.
pub fn desc_score(secs: i64, id: u64) -> f64 {
    -(secs as f64) + id_fraction(id)
}

/// Unix second an index score belongs to.
pub(crate) fn score_second(order: Order, score: f64) -> i64 {
    match order {
        Order::Asc => score.floor() as i64,
        Order::Desc => -(score.floor() as i64),
    }
}

/// Cursor codec for the Redis backend.
///
/// The position is the full ordering key of the last event, so a page can end
/// and resume inside one second. One token serves either scan direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisCursor;

impl RedisCursor {
    const TAG: &'static str = "r";
}

impl CursorCodec for RedisCursor {
    type Position = OrderingKey;

    fn encode(&self, key: &OrderingKey) -> String {
        cursor::seal(Self::TAG, &cursor::key_body(key))
    }

    fn decode(&self, token: &str) -> Result<OrderingKey> {
        let body = cursor::open(Self::TAG, token)?;
        cursor::parse_key(token, &body)
    }
}

/// Whole-second score interval covering a resolved range.
///
/// `min` is inclusive, `max` exclusive. Both are widened to second boundaries;
/// [`SecondGroups`] applies the exact bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ScoreRange {
    pub(crate) min: Option<f64>,
    pub(crate) max: Option<f64>,
}

impl ScoreRange {
    pub(crate) fn resolve(range: &ResolvedRange, after: Option<&OrderingKey>) -> Self {
        let after = after.map(|key| key.at.timestamp());
        match range.order {
            Order::Asc => {
                let first = [range.start.map(|start| start.timestamp()), after]
                    .into_iter()
                    .flatten()
                    .max();
                ScoreRange {
                    min: first.map(|secs| asc_score(secs, 0)),
                    max: range.end.map(|end| asc_score(end.timestamp() + 1, 0)),
                }
            }
            Order::Desc => {
                let first = [range.end.map(|end| end.timestamp()), after]
                    .into_iter()
                    .flatten()
                    .min();
                ScoreRange {
                    min: first.map(|secs| desc_score(secs, 0)),
                    max: range.start.map(|start| desc_score(start.timestamp() - 1, 0)),
                }
            }
        }
    }

    fn min_arg(&self) -> String {
        self.min.map_or_else(|| "-inf".to_string(), |v| v.to_string())
    }

    fn max_arg(&self) -> String {
        self.max.map_or_else(|| "+inf".to_string(), |v| format!("({}", v))
    }
}

/// Exact `(at, id)` order on top of the second-granular index.
///
/// Scanned events are buffered per index second. Once the scan reaches
/// another second the buffer is sorted by stored instant, filtered against the
/// exact bounds and the cursor, and released.
pub(crate) struct SecondGroups<'a> {
    range: &'a ResolvedRange,
    after: Option<&'a OrderingKey>,
    second: Option<i64>,
    pending: Vec<Event>,
    ready: Vec<Event>,
}

impl<'a> SecondGroups<'a> {
    pub(crate) fn new(range: &'a ResolvedRange, after: Option<&'a OrderingKey>) -> Self {
        Self {
            range,
            after,
            second: None,
            pending: Vec::new(),
            ready: Vec::new(),
        }
    }

    /// Feed the next index hit, in index order.
    pub(crate) fn push(&mut self, score: f64, event: Event) {
        let second = score_second(self.range.order, score);
        if self.second != Some(second) {
            self.release();
            self.second = Some(second);
        }
        self.pending.push(event);
    }

    /// Events from completed seconds.
    pub(crate) fn ready(&self) -> usize {
        self.ready.len()
    }

    /// Release the last second. Only call once the scan is exhausted or
    /// enough events are ready.
    pub(crate) fn finish(mut self) -> Vec<Event> {
        self.release();
        self.ready
    }

    fn release(&mut self) {
        let mut group = std::mem::take(&mut self.pending);
        self.range.order.sort(&mut group);
        group.retain(|event| self.admits(event));
        self.ready.extend(group);
    }

    fn admits(&self, event: &Event) -> bool {
        let range = self.range;
        if range.start.is_some_and(|start| event.at < start)
            || range.end.is_some_and(|end| event.at > end)
        {
            return false;
        }
        self.after.map_or(true, |after| {
            range.order.compare(after, &OrderingKey::of(event)) == Ordering::Less
        })
    }
}

/// Redis event store.
///
/// `create` and `delete` go out as one `MULTI`/`EXEC` pipeline, and `update`
/// runs as one script, so the hash and both indexes always change together.
/// An update racing a delete either lands before it or reports `NotFound`.
pub struct RedisEventStore {
    conn: ConnectionManager,
    key_prefix: String,
    codec: RedisCursor,
    update_script: Script,
}

impl RedisEventStore {
    /// Create a new Redis event store.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., redis://localhost:6379)
    /// * `key_prefix` - Prefix for all keys (default: "eventline")
    pub async fn new(url: &str, key_prefix: Option<&str>) -> Result<Self> {
        Self::with_initial_id(url, key_prefix, 1).await
    }

    /// Create a store whose identifier counter starts at `initial_id`.
    ///
    /// The seed only applies when the counter does not exist yet.
    pub async fn with_initial_id(
        url: &str,
        key_prefix: Option<&str>,
        initial_id: u64,
    ) -> Result<Self> {
        let client = Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;

        let store = Self {
            conn: conn.clone(),
            key_prefix: key_prefix.unwrap_or("eventline").to_string(),
            codec: RedisCursor,
            update_script: Script::new(UPDATE_SCRIPT),
        };

        // INCR returns the seed on first use.
        let _: bool = conn
            .set_nx(store.next_id_key(), initial_id as i64 - 1)
            .await?;

        info!(url = %url, prefix = %store.key_prefix, "Connected to Redis");

        Ok(store)
    }

    /// Build the identifier counter key.
    fn next_id_key(&self) -> String {
        format!("{}:next_id", self.key_prefix)
    }

    /// Build the hash key for an event.
    fn event_key(&self, id: u64) -> String {
        format!("{}:event:{}", self.key_prefix, id)
    }

    /// Build the ascending index key.
    fn asc_key(&self) -> String {
        format!("{}:timeline:asc", self.key_prefix)
    }

    /// Build the descending index key.
    fn desc_key(&self) -> String {
        format!("{}:timeline:desc", self.key_prefix)
    }

    fn index_key(&self, order: Order) -> String {
        match order {
            Order::Asc => self.asc_key(),
            Order::Desc => self.desc_key(),
        }
    }

    fn seq(id: &EventId) -> Result<u64> {
        id.as_seq().ok_or_else(|| StorageError::NotFound(id.clone()))
    }

    fn format_at(at: DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }

    /// Rebuild an event from its hash. An empty hash means no such event.
    fn decode_event(id: u64, mut fields: HashMap<String, String>) -> Result<Option<Event>> {
        if fields.is_empty() {
            return Ok(None);
        }

        let malformed =
            |what: &str| StorageError::BackendUnavailable(format!("malformed event {}: {}", id, what));

        let at = fields.get("at").ok_or_else(|| malformed("missing at"))?;
        let at = DateTime::parse_from_rfc3339(at)
            .map_err(|_| malformed("bad at"))?
            .with_timezone(&Utc);
        let data = fields.remove("data").ok_or_else(|| malformed("missing data"))?;

        Ok(Some(Event {
            id: EventId::Seq(id),
            at,
            data,
        }))
    }

    /// Fetch the hashes for `ids` in one pipeline, preserving order.
    ///
    /// Identifiers whose hash vanished since the index scan come back as `None`.
    async fn load(&self, conn: &mut ConnectionManager, ids: &[u64]) -> Result<Vec<Option<Event>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for &id in ids {
            pipe.hgetall(self.event_key(id));
        }
        let rows: Vec<HashMap<String, String>> = pipe.query_async(conn).await?;

        ids.iter()
            .zip(rows)
            .map(|(&id, fields)| Self::decode_event(id, fields))
            .collect()
    }

    /// Load one batch of `(id, score)` index hits into `groups`.
    async fn collect(
        &self,
        conn: &mut ConnectionManager,
        groups: &mut SecondGroups<'_>,
        hits: &[(u64, f64)],
    ) -> Result<()> {
        let ids: Vec<u64> = hits.iter().map(|&(id, _)| id).collect();
        let events = self.load(conn, &ids).await?;
        for (&(_, score), event) in hits.iter().zip(events) {
            if let Some(event) = event {
                groups.push(score, event);
            }
        }
        Ok(())
    }

    /// Scan the index by whole seconds and order each second exactly.
    async fn scan(&self, range: &ResolvedRange, after: Option<&OrderingKey>) -> Result<Vec<Event>> {
        let scores = ScoreRange::resolve(range, after);
        let key = self.index_key(range.order);
        let min = scores.min_arg();
        let max = scores.max_arg();
        let mut conn = self.conn.clone();
        let mut groups = SecondGroups::new(range, after);

        let Some(limit) = range.limit else {
            let hits: Vec<(u64, f64)> = conn.zrangebyscore_withscores(&key, &min, &max).await?;
            self.collect(&mut conn, &mut groups, &hits).await?;
            debug!(key = %key, min = %min, max = %max, scanned = hits.len(), "Scanned Redis index");
            return Ok(groups.finish());
        };

        // Hits outside the exact bounds are dropped, so one batch may not
        // fill the page.
        let batch = limit.max(SCAN_BATCH);
        let mut offset = 0usize;
        loop {
            let hits: Vec<(u64, f64)> = conn
                .zrangebyscore_limit_withscores(&key, &min, &max, offset as isize, batch as isize)
                .await?;
            offset += hits.len();
            self.collect(&mut conn, &mut groups, &hits).await?;
            if hits.len() < batch || groups.ready() >= limit {
                break;
            }
        }

        debug!(key = %key, min = %min, max = %max, scanned = offset, "Scanned Redis index");
        let mut events = groups.finish();
        events.truncate(limit);
        Ok(events)
    }
}

#[async_trait]
impl EventStore for RedisEventStore {
    async fn create(&self, at: RawInstant, data: String) -> Result<Event> {
        let at = at.normalize()?;
        let mut conn = self.conn.clone();

        let id: u64 = conn.incr(self.next_id_key(), 1).await?;
        let secs = at.timestamp();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset_multiple(
                self.event_key(id),
                &[("at", Self::format_at(at)), ("data", data.clone())],
            )
            .ignore()
            .zadd(self.asc_key(), id, asc_score(secs, id))
            .ignore()
            .zadd(self.desc_key(), id, desc_score(secs, id))
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        debug!(id, at = %at, "Stored event in Redis");

        Ok(Event {
            id: EventId::Seq(id),
            at,
            data,
        })
    }

    async fn get(&self, id: &EventId) -> Result<Event> {
        let seq = Self::seq(id)?;
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn.hgetall(self.event_key(seq)).await?;
        Self::decode_event(seq, fields)?.ok_or_else(|| StorageError::NotFound(id.clone()))
    }

    async fn update(&self, id: &EventId, patch: EventPatch) -> Result<Event> {
        let seq = Self::seq(id)?;
        let new_at = patch.at.map(RawInstant::normalize).transpose()?;
        let secs = new_at.map_or(0, |at| at.timestamp());

        let mut invocation = self.update_script.prepare_invoke();
        invocation
            .key(self.event_key(seq))
            .key(self.asc_key())
            .key(self.desc_key())
            .arg(seq)
            .arg(new_at.map(Self::format_at).unwrap_or_default())
            .arg(asc_score(secs, seq))
            .arg(desc_score(secs, seq))
            .arg(if patch.data.is_some() { "1" } else { "0" })
            .arg(patch.data.as_deref().unwrap_or_default());

        let mut conn = self.conn.clone();
        let fields: Option<HashMap<String, String>> = invocation.invoke_async(&mut conn).await?;
        let event = fields
            .map(|fields| Self::decode_event(seq, fields))
            .transpose()?
            .flatten()
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;

        debug!(id = seq, at = %event.at, relocated = new_at.is_some(), "Updated event in Redis");
        Ok(event)
    }

    async fn delete(&self, id: &EventId) -> Result<()> {
        let seq = Self::seq(id)?;
        let mut conn = self.conn.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .zrem(self.asc_key(), seq)
            .ignore()
            .zrem(self.desc_key(), seq)
            .ignore()
            .del(self.event_key(seq));
        let (removed,): (u64,) = pipe.query_async(&mut conn).await?;

        if removed == 0 {
            return Err(StorageError::NotFound(id.clone()));
        }

        debug!(id = seq, "Deleted event from Redis");
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
            self.scan(&range, after.as_ref()).await?
        };

        range.finish(events, |last| Ok(self.codec.encode(&OrderingKey::of(last))))
    }

    async fn clear(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}:event:*", self.key_prefix);

        // Use SCAN to find matching keys (non-blocking iteration)
        let mut cursor = 0u64;
        let mut deleted = 0usize;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                deleted += keys.len();
                let _: () = conn.del(&keys).await?;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        let _: () = conn.del(&[self.asc_key(), self.desc_key()]).await?;

        // The identifier counter survives: ids are never reused across clears.
        debug!(prefix = %self.key_prefix, deleted, "Cleared Redis event store");
        Ok(())
    }
}
