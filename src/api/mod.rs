//! HTTP surface over an [`EventStore`](crate::storage::EventStore).

mod error;
mod rest;

pub use error::ApiError;
pub use rest::{router, serve};
