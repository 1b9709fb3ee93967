//! Broadcast service implementation.
//!
//! Publishes relay output to downstream consumers:
//! - `EventBroadcaster`: envelope construction, destinations and partition keys
//! - `BroadcastSink`: where envelopes go, with webhook and in-process channel sinks
//! - Error handling for publication

mod broadcaster;
mod error;
mod sink;

pub use broadcaster::EventBroadcaster;
pub use error::BroadcastError;
pub use sink::{BroadcastSink, ChannelSink, PublishedEnvelope, WebhookSink};
