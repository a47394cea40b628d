//! Redis storage implementation.

mod event_store;

pub use event_store::{asc_score, desc_score, RedisCursor, RedisEventStore, ID_SLOTS};
