//! Node client interfaces and implementations.
//!
//! - `NodeClient`: the interface every ledger binding implements
//! - `JsonRpcNodeClient`: JSON-RPC over HTTP binding
//! - `ClientPool`: per-node client cache
//! - Error handling for node operations

mod client;
mod error;
mod json_rpc;
mod pool;

pub use client::{BlockStream, NodeClient};
pub use error::BlockChainError;
pub use json_rpc::JsonRpcNodeClient;
pub use pool::{ClientFactory, ClientPool};
