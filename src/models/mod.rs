//! Domain models and data structures for the relay.
//!
//! - `blockchain`: blocks, transactions and logs as observed on a node
//! - `config`: configuration loading and validation
//! - `core`: filters, monitoring specs, nodes, cluster messages and broadcast envelopes

mod blockchain;
mod config;
mod core;

pub use blockchain::{
	Block, ContractEventDetails, ContractEventStatus, ContractLog, LogQuery, Transaction,
	TransactionMatch, TransactionReceipt, TransactionStatus,
};

pub use core::{
	BlockStrategyType, BroadcasterConfig, ClusterConfig, ClusterControlMessage, ClusterEnvelope,
	ContractEventFilter, CorrelationIdStrategy, DestinationConfig, MessageEnvelope, MessageType,
	Node, NodeHealthState, NodeType, ReconnectConfig, RelayConfig, TransactionIdentifierType,
	TransactionMonitoringSpec,
};

pub use config::{ConfigError, ConfigLoader};
