//! Abstract interfaces for eventline components.
//!
//! These traits define the contracts for:
//! - Event storage (timeline persistence and range pagination)

pub mod event_store;

pub use event_store::{EventStore, Result, StorageError};
