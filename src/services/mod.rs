//! Core services of the relay.
//!
//! - `blockchain`: node client interface, JSON-RPC binding and client pool
//! - `blockwatcher`: block subscription strategies, block cache and checkpoints
//! - `dispatch`: per-node sequential task queues
//! - `health`: node health supervision and reconnection
//! - `filter`: matching of contract events and transactions
//! - `registry`: active filters and monitoring specs
//! - `cluster`: synchronization of registry changes across instances
//! - `broadcast`: publication of relay output

pub mod blockchain;
pub mod blockwatcher;
pub mod broadcast;
pub mod cluster;
pub mod dispatch;
pub mod filter;
pub mod health;
pub mod registry;
