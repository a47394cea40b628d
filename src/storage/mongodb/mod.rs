//! MongoDB storage implementation.

mod event_store;

pub use event_store::{MongoCursor, MongoEventStore, MongoPosition};
