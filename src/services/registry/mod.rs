//! Registry of active filters and monitoring specs.

mod error;
mod service;

pub use error::RegistryError;
pub use service::{RegisteredMonitor, SubscriptionRegistry};
