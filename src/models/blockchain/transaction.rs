//! Transaction data structures.

use alloy::primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ContractLog;

/// Lifecycle status of a transaction as seen by the relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
	/// Included in a block, receipt not yet inspected
	#[default]
	Unconfirmed,
	/// Receipt reports success
	Confirmed,
	/// Receipt reports failure
	Failed,
}

impl TransactionStatus {
	pub const ALL: [TransactionStatus; 3] = [
		TransactionStatus::Unconfirmed,
		TransactionStatus::Confirmed,
		TransactionStatus::Failed,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Unconfirmed => "UNCONFIRMED",
			Self::Confirmed => "CONFIRMED",
			Self::Failed => "FAILED",
		}
	}
}

impl fmt::Display for TransactionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A transaction included in a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	pub hash: B256,
	pub from: Address,
	/// Recipient, absent for contract creation
	#[serde(default)]
	pub to: Option<Address>,
	pub block_hash: B256,
	pub block_number: u64,
	#[serde(default)]
	pub input: Bytes,
	#[serde(default)]
	pub status: TransactionStatus,
	/// Receipt logs, when the node or a transaction-pass extension supplied them
	#[serde(default)]
	pub logs: Vec<ContractLog>,
}

/// Receipt returned by the node for a mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	pub transaction_hash: B256,
	pub block_hash: B256,
	pub block_number: u64,
	pub success: bool,
	#[serde(default)]
	pub logs: Vec<ContractLog>,
}

impl TransactionReceipt {
	pub fn status(&self) -> TransactionStatus {
		if self.success {
			TransactionStatus::Confirmed
		} else {
			TransactionStatus::Failed
		}
	}
}

/// A transaction matched by a monitoring spec, as handed to listeners and broadcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMatch {
	pub spec_id: String,
	pub node_name: String,
	pub transaction: Transaction,
	/// Block timestamp in seconds since the epoch
	pub timestamp: u64,
}
