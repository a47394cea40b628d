//! Eventline - timeline event store
//!
//! Stores timestamped events and serves time-range queries in ascending or
//! descending order with cursor-based pagination, over interchangeable
//! in-memory, Redis and MongoDB backends.

pub mod api;
pub mod config;
pub mod cursor;
pub mod interfaces;
pub mod model;
pub mod storage;
pub mod utils;
