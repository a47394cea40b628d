//! MongoDB EventStore implementation.
//!
//! One document per event: `{ _id: ObjectId, at: Date, data: String }`.
//! Compound indexes on `(at, _id)` serve both scan directions. BSON dates are
//! millisecond-precision, and instants are truncated to whole seconds before
//! they are written.
//!
//! Range bounds are not truncated: `start = X.700` excludes an event created
//! at `X.700`, because that event is stored at `X`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime, Document};
use mongodb::options::{FindOptions, ReturnDocument};
use mongodb::{Client, Collection, IndexModel};
use serde::Deserialize;
use tracing::{debug, info};

use crate::cursor::{self, CursorCodec};
use crate::model::{
    truncate_to_seconds, Event, EventId, EventPatch, Order, RangeQuery, RangeResult, RawInstant,
    ResolvedRange,
};
use crate::storage::{EventStore, Result, StorageError};

/// Resumption point: instant and identifier of the last event on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MongoPosition {
    pub at: DateTime<Utc>,
    pub id: ObjectId,
}

#[derive(Deserialize)]
struct CursorBody {
    at: i64,
    id: String,
}

/// Cursor codec for the MongoDB backend. The body is `{"at": millis, "id": hex}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoCursor;

impl MongoCursor {
    const TAG: &'static str = "d";
}

impl CursorCodec for MongoCursor {
    type Position = MongoPosition;

    fn encode(&self, position: &MongoPosition) -> String {
        let body = serde_json::json!({
            "at": position.at.timestamp_millis(),
            "id": position.id.to_hex(),
        });
        cursor::seal(Self::TAG, &body.to_string())
    }

    fn decode(&self, token: &str) -> Result<MongoPosition> {
        let body = cursor::open(Self::TAG, token)?;
        let body: CursorBody =
            serde_json::from_str(&body).map_err(|_| cursor::invalid(token, "malformed position"))?;
        Ok(MongoPosition {
            at: DateTime::from_timestamp_millis(body.at)
                .ok_or_else(|| cursor::invalid(token, "bad instant"))?,
            id: ObjectId::parse_str(&body.id)
                .map_err(|_| cursor::invalid(token, "bad identifier"))?,
        })
    }
}

pub(crate) fn to_bson(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

/// Sort document for a scan direction. Ties always break on ascending `_id`.
pub(crate) fn sort_for(order: Order) -> Document {
    match order {
        Order::Asc => doc! { "at": 1, "_id": 1 },
        Order::Desc => doc! { "at": -1, "_id": 1 },
    }
}

/// Query filter for a resolved range, resuming strictly after `after`.
pub(crate) fn range_filter(range: &ResolvedRange, after: Option<&MongoPosition>) -> Document {
    let mut clauses = Vec::new();

    if let Some(start) = range.start {
        clauses.push(doc! { "at": { "$gte": to_bson(start) } });
    }
    if let Some(end) = range.end {
        clauses.push(doc! { "at": { "$lte": to_bson(end) } });
    }
    if let Some(after) = after {
        let mut past = Document::new();
        past.insert(if range.order.is_desc() { "$lt" } else { "$gt" }, to_bson(after.at));
        clauses.push(doc! {
            "$or": [
                { "at": past },
                { "at": to_bson(after.at), "_id": { "$gt": after.id } }
            ]
        });
    }

    match clauses.len() {
        0 => Document::new(),
        1 => clauses.remove(0),
        _ => doc! { "$and": clauses },
    }
}

/// MongoDB event store.
pub struct MongoEventStore {
    events: Collection<Document>,
    codec: MongoCursor,
}

impl MongoEventStore {
    /// Create a new MongoDB event store and ensure its indexes.
    pub async fn new(client: &Client, database_name: &str, collection_name: &str) -> Result<Self> {
        let events = client.database(database_name).collection(collection_name);

        let store = Self {
            events,
            codec: MongoCursor,
        };
        store.init().await?;

        info!(
            database = database_name,
            collection = collection_name,
            "Connected to MongoDB"
        );

        Ok(store)
    }

    /// Initialize indexes for both scan directions.
    async fn init(&self) -> Result<()> {
        let ascending = IndexModel::builder().keys(sort_for(Order::Asc)).build();
        self.events.create_index(ascending).await?;

        let descending = IndexModel::builder().keys(sort_for(Order::Desc)).build();
        self.events.create_index(descending).await?;

        Ok(())
    }

    /// Malformed identifiers cannot name a stored event.
    fn object_id(id: &EventId) -> Result<ObjectId> {
        match id {
            EventId::Object(hex) => {
                ObjectId::parse_str(hex).map_err(|_| StorageError::NotFound(id.clone()))
            }
            EventId::Seq(_) => Err(StorageError::NotFound(id.clone())),
        }
    }

    fn decode_event(doc: &Document) -> Result<Event> {
        let malformed = |what: &str| StorageError::BackendUnavailable(format!("malformed event: {}", what));

        let id = doc.get_object_id("_id").map_err(|_| malformed("_id"))?;
        let at = doc.get_datetime("at").map_err(|_| malformed("at"))?;
        let at = DateTime::from_timestamp_millis(at.timestamp_millis())
            .ok_or_else(|| malformed("at out of range"))?;
        let data = doc.get_str("data").map_err(|_| malformed("data"))?;

        Ok(Event {
            id: EventId::Object(id.to_hex()),
            at,
            data: data.to_string(),
        })
    }

    fn position_of(event: &Event) -> Result<MongoPosition> {
        Ok(MongoPosition {
            at: event.at,
            id: Self::object_id(&event.id)?,
        })
    }
}

#[async_trait]
impl EventStore for MongoEventStore {
    async fn create(&self, at: RawInstant, data: String) -> Result<Event> {
        let at = truncate_to_seconds(at.normalize()?);
        let id = ObjectId::new();

        self.events
            .insert_one(doc! { "_id": id, "at": to_bson(at), "data": data.as_str() })
            .await?;

        debug!(id = %id, at = %at, "Stored event in MongoDB");

        Ok(Event {
            id: EventId::Object(id.to_hex()),
            at,
            data,
        })
    }

    async fn get(&self, id: &EventId) -> Result<Event> {
        let oid = Self::object_id(id)?;
        let doc = self
            .events
            .find_one(doc! { "_id": oid })
            .await?
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;
        Self::decode_event(&doc)
    }

    async fn update(&self, id: &EventId, patch: EventPatch) -> Result<Event> {
        let oid = Self::object_id(id)?;
        let new_at = patch
            .at
            .map(RawInstant::normalize)
            .transpose()?
            .map(truncate_to_seconds);

        let mut set = Document::new();
        if let Some(at) = new_at {
            set.insert("at", to_bson(at));
        }
        if let Some(data) = patch.data {
            set.insert("data", data);
        }
        if set.is_empty() {
            return self.get(id).await;
        }

        // Single-document update: the index entry moves with the write.
        let doc = self
            .events
            .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.clone()))?;

        debug!(id = %oid, "Updated event in MongoDB");
        Self::decode_event(&doc)
    }

    async fn delete(&self, id: &EventId) -> Result<()> {
        let oid = Self::object_id(id)?;
        let result = self.events.delete_one(doc! { "_id": oid }).await?;

        if result.deleted_count == 0 {
            return Err(StorageError::NotFound(id.clone()));
        }

        debug!(id = %oid, "Deleted event from MongoDB");
        Ok(())
    }

    async fn range(&self, query: RangeQuery) -> Result<RangeResult> {
        let range = query.resolve()?;
        let after = range
            .cursor
            .as_deref()
            .map(|token| self.codec.decode(token))
            .transpose()?;

        let mut events = Vec::new();
        if !range.is_empty_interval() {
            let filter = range_filter(&range, after.as_ref());
            let mut options = FindOptions::builder().sort(sort_for(range.order)).build();
            options.limit = range.limit.map(|limit| limit as i64);

            debug!(filter = %filter, "MongoDB range query starting");

            let mut cursor = self.events.find(filter).with_options(options).await?;
            while cursor.advance().await? {
                let doc = cursor.deserialize_current()?;
                events.push(Self::decode_event(&doc)?);
            }
        }

        range.finish(events, |last| {
            Self::position_of(last).map(|position| self.codec.encode(&position))
        })
    }

    async fn clear(&self) -> Result<()> {
        self.events.drop().await?;
        self.init().await?;

        debug!(collection = %self.events.name(), "Cleared MongoDB event store");
        Ok(())
    }
}
