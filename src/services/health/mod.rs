//! Node health supervision.
//!
//! Composed from a [`BlockSource`] (what is observed and restarted) and a
//! [`ReconnectPolicy`] (how long to wait between attempts), both injected into one
//! [`HealthSupervisor`] per node.

mod error;
mod policy;
mod source;
mod supervisor;

pub use error::HealthError;
pub use policy::{BackoffReconnectPolicy, ReconnectPolicy};
pub use source::{BlockSource, StrategyBlockSource};
pub use supervisor::{HealthSupervisor, HealthTransition};
