use alloy::primitives::{keccak256, Address, B256};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::models::ContractLog;

/// A contract event filter registered with the relay.
///
/// Identity is the `id`; a filter lives until it is explicitly unregistered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractEventFilter {
	/// Unique identifier, generated at registration when empty
	#[serde(default)]
	pub id: String,
	/// Node the filter applies to
	pub node_name: String,
	/// Emitting contract; any address matches when absent
	#[serde(default)]
	pub contract_address: Option<Address>,
	/// Canonical event signature, e.g. `Transfer(address,address,uint256)`
	pub event_signature: String,
	/// How to derive the broadcast partition key from a matched event
	#[serde(default)]
	pub correlation_id_strategy: Option<CorrelationIdStrategy>,
	/// First block the filter cares about
	#[serde(default)]
	pub start_block: Option<u64>,
	/// Opaque settings for ledger-dialect extensions
	#[serde(default)]
	pub extension: HashMap<String, serde_json::Value>,
}

impl ContractEventFilter {
	/// Topic 0 of every log emitted for this event
	pub fn event_topic(&self) -> B256 {
		keccak256(self.event_signature.as_bytes())
	}

	/// Event name without its parameter list
	pub fn event_name(&self) -> &str {
		self.event_signature
			.split_once('(')
			.map(|(name, _)| name)
			.unwrap_or(&self.event_signature)
	}

	/// Assigns an identifier derived from what the filter watches when none was supplied.
	///
	/// Two id-less filters for the same node, contract, event and start block get the same
	/// id, so a filter rebuilt on every start replaces its persisted copy.
	pub fn ensure_content_id(&mut self) {
		if self.id.trim().is_empty() {
			self.id = self.content_id();
		}
	}

	/// Hex SHA-256 of `node|address|signature|start_block`
	pub fn content_id(&self) -> String {
		let address = self
			.contract_address
			.map(|address| format!("{:#x}", address))
			.unwrap_or_default();
		let start_block = self
			.start_block
			.map(|block| block.to_string())
			.unwrap_or_default();
		let mut hasher = Sha256::new();
		hasher.update(format!(
			"{}|{}|{}|{}",
			self.node_name,
			address,
			self.event_signature.trim(),
			start_block
		));
		hex::encode(hasher.finalize())
	}

	/// Assigns a random identifier when none was supplied
	pub fn ensure_id(&mut self) {
		if self.id.trim().is_empty() {
			self.id = uuid::Uuid::new_v4().to_string();
		}
	}

	pub fn validate(&self) -> Result<(), String> {
		if self.node_name.trim().is_empty() {
			return Err("Filter node_name must not be empty".to_string());
		}

		if !self
			.id
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
		{
			return Err(format!(
				"Filter id '{}' must contain only letters, numbers, dashes and underscores",
				self.id
			));
		}

		let signature = self.event_signature.trim();
		let well_formed = signature
			.split_once('(')
			.map(|(name, rest)| !name.is_empty() && rest.ends_with(')'))
			.unwrap_or(false);
		if !well_formed || signature.contains(' ') {
			return Err(format!(
				"Event signature '{}' must look like Name(type1,type2)",
				self.event_signature
			));
		}

		Ok(())
	}
}

/// Maps a matched event to the partition key used when broadcasting it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CorrelationIdStrategy {
	/// Use indexed parameter `parameter_index`, i.e. topic `parameter_index + 1`
	IndexedParameter { parameter_index: usize },
	/// Use the `parameter_index`-th 32-byte word of the log data
	NonIndexedParameter { parameter_index: usize },
}

impl CorrelationIdStrategy {
	/// Extracts the correlation id from a log.
	///
	/// # Returns
	/// * `Option<String>` - Lowercase 0x-prefixed hex of the parameter, or `None` when the
	///   log does not carry the parameter
	pub fn correlation_id(&self, log: &ContractLog) -> Option<String> {
		match self {
			Self::IndexedParameter { parameter_index } => parameter_index
				.checked_add(1)
				.and_then(|index| log.topics.get(index))
				.map(|topic| format!("0x{}", hex::encode(topic))),
			Self::NonIndexedParameter { parameter_index } => {
				let start = parameter_index.checked_mul(32)?;
				let end = start.checked_add(32)?;
				log.data
					.get(start..end)
					.map(|word| format!("0x{}", hex::encode(word)))
			}
		}
	}
}
