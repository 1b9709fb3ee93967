//! Repository implementations for configuration and persisted subscriptions.
//!
//! - Node, filter and monitor repositories load the static JSON configuration
//! - The subscription store persists filters and specs registered at runtime

mod error;
mod filter;
mod monitor;
mod node;
mod store;

pub use error::RepositoryError;
pub use filter::{FilterRepository, FilterRepositoryTrait, FilterService};
pub use monitor::{MonitorRepository, MonitorRepositoryTrait, MonitorService};
pub use node::{NodeRepository, NodeRepositoryTrait, NodeService};
pub use store::{FileSubscriptionStore, SubscriptionStore, WritableSubscriptionStore};
