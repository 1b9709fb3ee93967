//! Contract log and event data structures.

use alloy::primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};

use crate::models::{Block, ContractEventFilter};

/// A raw log as returned by the node's log query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractLog {
	pub address: Address,
	pub topics: Vec<B256>,
	#[serde(default)]
	pub data: Bytes,
	pub block_number: u64,
	pub block_hash: B256,
	pub transaction_hash: B256,
	pub log_index: u64,
}

/// Parameters of a log query against a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
	pub address: Option<Address>,
	/// Topic constraints by position; only topic 0 is used by event filters
	pub topics: Vec<B256>,
	pub from_block: u64,
	pub to_block: u64,
}

impl LogQuery {
	/// Query for the logs of `filter` inside a single block
	pub fn for_block(filter: &ContractEventFilter, block_number: u64) -> Self {
		Self {
			address: filter.contract_address,
			topics: vec![filter.event_topic()],
			from_block: block_number,
			to_block: block_number,
		}
	}
}

/// Status of a contract event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractEventStatus {
	#[default]
	Unconfirmed,
	Confirmed,
	Invalidated,
}

/// A contract event matched by a filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEventDetails {
	/// Stable identity of the event across redelivery
	pub id: String,
	pub filter_id: String,
	/// Event name taken from the filter signature
	pub name: String,
	pub node_name: String,
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Bytes,
	pub transaction_hash: B256,
	pub log_index: u64,
	pub block_number: u64,
	pub block_hash: B256,
	/// Timestamp of the containing block in seconds
	pub timestamp: u64,
	pub status: ContractEventStatus,
}

impl ContractEventDetails {
	/// Builds the event for a log matched by `filter` in `block`.
	///
	/// The event is stamped with the block timestamp and starts out unconfirmed.
	pub fn from_log(filter: &ContractEventFilter, block: &Block, log: &ContractLog) -> Self {
		Self {
			id: format!("{}-{}-{}", log.transaction_hash, log.block_hash, log.log_index),
			filter_id: filter.id.clone(),
			name: filter.event_name().to_string(),
			node_name: block.node_name.clone(),
			address: log.address,
			topics: log.topics.clone(),
			data: log.data.clone(),
			transaction_hash: log.transaction_hash,
			log_index: log.log_index,
			block_number: log.block_number,
			block_hash: log.block_hash,
			timestamp: block.timestamp,
			status: ContractEventStatus::Unconfirmed,
		}
	}

	/// The raw log this event was built from
	pub fn to_log(&self) -> ContractLog {
		ContractLog {
			address: self.address,
			topics: self.topics.clone(),
			data: self.data.clone(),
			block_number: self.block_number,
			block_hash: self.block_hash,
			transaction_hash: self.transaction_hash,
			log_index: self.log_index,
		}
	}
}
