//! Block data structures.

use alloy::primitives::{Bloom, B256};
use serde::{Deserialize, Serialize};

use super::Transaction;

/// A block observed on a single node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
	pub number: u64,
	pub hash: B256,
	pub parent_hash: B256,
	/// Block timestamp in seconds since the epoch
	pub timestamp: u64,
	/// Bloom filter over every log address and topic in the block
	pub logs_bloom: Bloom,
	#[serde(default)]
	pub transactions: Vec<Transaction>,
	/// Name of the node the block was observed on
	pub node_name: String,
}

impl Block {
	/// Checks that a block delivered for `node_name` is well formed.
	///
	/// # Arguments
	/// * `node_name` - Node the block was requested from
	/// * `expected_number` - Block number that was requested, if any
	///
	/// # Returns
	/// * `Result<(), String>` - Ok if the block can be processed, otherwise the reason it
	///   must be dropped
	pub fn validate(&self, node_name: &str, expected_number: Option<u64>) -> Result<(), String> {
		if self.node_name != node_name {
			return Err(format!(
				"block {} belongs to node '{}', expected '{}'",
				self.number, self.node_name, node_name
			));
		}

		if self.hash.is_zero() {
			return Err(format!("block {} has an empty hash", self.number));
		}

		if let Some(expected) = expected_number {
			if self.number != expected {
				return Err(format!(
					"requested block {} but node returned {}",
					expected, self.number
				));
			}
		}

		if let Some(tx) = self
			.transactions
			.iter()
			.find(|tx| tx.block_number != self.number)
		{
			return Err(format!(
				"transaction {} reports block {} inside block {}",
				tx.hash, tx.block_number, self.number
			));
		}

		Ok(())
	}
}
