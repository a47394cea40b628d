//! Timeline data model.
//!
//! - [`Event`]: the stored unit (identifier, UTC instant, opaque payload)
//! - [`OrderingKey`]: `(at, id)`, the total order shared by every backend
//! - [`RangeQuery`] / [`RangeResult`]: range scans and their pages

mod event;
mod instant;
mod ordering;
mod query;

pub use event::{Event, EventId, EventPatch};
pub use instant::{truncate_to_seconds, RawInstant};
pub use ordering::{IdGenerator, Order, OrderingKey};
pub use query::{Page, RangeQuery, RangeResult, ResolvedRange};
