//! Event delivery to the analytics backend
//!
//! The dispatch core only knows the [`Broker`] trait; delivery mechanics
//! (HTTP, batching, retries) live entirely behind it. [`SegmentBroker`] is
//! the production implementation over the Segment HTTP API.

mod segment;

pub use segment::SegmentBroker;

use crate::event::Event;

/// Delivers one event to the remote analytics endpoint.
///
/// Fire-and-forget from the dispatch core's standpoint: no return value, no
/// blocking beyond a queue handoff, and delivery failures never reach the
/// caller.
pub trait Broker: Send + Sync {
    fn send(&self, event: Event);
}
