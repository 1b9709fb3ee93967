//! Core domain models for the relay.
//!
//! - Filters and monitoring specs: what operators ask the relay to watch for
//! - Nodes and relay settings: where and how to watch
//! - Cluster messages and broadcast envelopes: what the relay emits

mod cluster;
mod envelope;
mod filter;
mod health;
mod monitor;
mod node;
mod relay;

pub use cluster::{ClusterControlMessage, ClusterEnvelope};
pub use envelope::{MessageEnvelope, MessageType};
pub use filter::{ContractEventFilter, CorrelationIdStrategy};
pub use health::NodeHealthState;
pub use monitor::{TransactionIdentifierType, TransactionMonitoringSpec};
pub use node::{BlockStrategyType, Node, NodeType};
pub use relay::{BroadcasterConfig, ClusterConfig, DestinationConfig, ReconnectConfig, RelayConfig};
