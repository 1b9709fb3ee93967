//! Chain event relay.
//!
//! Watches blockchain nodes for new blocks, recognizes contract events and transactions that
//! match operator-registered filters, and republishes them to downstream consumers. Several
//! relay instances can run side by side and keep their subscriptions in sync through a
//! cluster bus.
//!
//! # Architecture
//! - `models`: blocks, transactions, filters, monitoring specs and configuration
//! - `repositories`: configured nodes, filters and specs, plus the persisted subscription store
//! - `services`: block subscription, health supervision, dispatch, matching, registry,
//!   cluster synchronization and broadcasting
//! - `bootstrap`: startup composition of all of the above

pub mod bootstrap;
pub mod models;
pub mod repositories;
pub mod services;
pub mod utils;
