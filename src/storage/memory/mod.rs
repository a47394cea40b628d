//! In-memory storage implementation.

mod event_store;

pub use event_store::{MemoryCursor, MemoryEventStore};
