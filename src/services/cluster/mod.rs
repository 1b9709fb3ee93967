//! Cluster synchronization of filters and monitoring specs.
//!
//! Redundant relay instances share a cluster bus carrying add/remove control messages.
//! Delivery is at-least-once and every message is applied idempotently by id.

mod bus;
mod error;
mod sync;

pub use bus::{ClusterBus, ClusterSubscription, InMemoryClusterBus};
pub use error::ClusterError;
pub use sync::{ClusterConsumer, ClusterMessageHandler, ClusterPublisher};
