use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::models::TransactionStatus;

/// What a transaction monitoring spec identifies transactions by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionIdentifierType {
	/// Transaction hash
	Hash,
	/// Recipient address
	ToAddress,
	/// Sender address
	FromAddress,
	/// Topic emitted by any of the transaction's logs
	Topic,
	/// Any identifier type this relay cannot compile into matching criteria
	#[serde(other)]
	Unsupported,
}

impl TransactionIdentifierType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Hash => "HASH",
			Self::ToAddress => "TO_ADDRESS",
			Self::FromAddress => "FROM_ADDRESS",
			Self::Topic => "TOPIC",
			Self::Unsupported => "UNSUPPORTED",
		}
	}
}

/// Operator request to watch for transactions on one node.
///
/// The `id` is derived from the normalized value, type, node and statuses, so registering
/// an identical spec twice resolves to the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionMonitoringSpec {
	#[serde(default)]
	pub id: String,
	#[serde(rename = "type")]
	pub type_: TransactionIdentifierType,
	pub node_name: String,
	pub transaction_identifier_value: String,
	/// Statuses the spec fires for; all statuses when empty
	#[serde(default)]
	pub statuses: Vec<TransactionStatus>,
	#[serde(default)]
	pub extension: HashMap<String, serde_json::Value>,
}

impl TransactionMonitoringSpec {
	/// Creates a normalized spec with its deterministic id
	pub fn new(
		type_: TransactionIdentifierType,
		transaction_identifier_value: impl Into<String>,
		node_name: impl Into<String>,
		statuses: Vec<TransactionStatus>,
	) -> Self {
		let mut spec = Self {
			id: String::new(),
			type_,
			node_name: node_name.into(),
			transaction_identifier_value: transaction_identifier_value.into(),
			statuses,
			extension: HashMap::new(),
		};
		spec.normalize();
		spec
	}

	/// Normalizes the identifier value and statuses, then recomputes the id.
	///
	/// Addresses are EIP-55 checksummed, hashes and topics are lowercased. Values that do
	/// not parse as addresses are kept verbatim and rejected later when criteria are compiled.
	pub fn normalize(&mut self) {
		let value = self.transaction_identifier_value.trim();
		self.transaction_identifier_value = match self.type_ {
			TransactionIdentifierType::ToAddress | TransactionIdentifierType::FromAddress => value
				.parse::<Address>()
				.map(|address| address.to_checksum(None))
				.unwrap_or_else(|_| value.to_string()),
			_ => value.to_lowercase(),
		};

		if self.statuses.is_empty() {
			self.statuses = TransactionStatus::ALL.to_vec();
		}
		self.statuses.sort();
		self.statuses.dedup();

		self.id = Self::generate_id(
			&self.transaction_identifier_value,
			self.type_,
			&self.node_name,
			&self.statuses,
		);
	}

	/// Deterministic id for a spec: hex SHA-256 over value, type, node and statuses
	pub fn generate_id(
		value: &str,
		type_: TransactionIdentifierType,
		node_name: &str,
		statuses: &[TransactionStatus],
	) -> String {
		let statuses = statuses
			.iter()
			.map(|status| status.as_str())
			.collect::<Vec<_>>()
			.join(",");
		let mut hasher = Sha256::new();
		hasher.update(format!("{}|{}|{}|{}", value, type_.as_str(), node_name, statuses));
		hex::encode(hasher.finalize())
	}

	pub fn validate(&self) -> Result<(), String> {
		if self.node_name.trim().is_empty() {
			return Err("Monitoring spec node_name must not be empty".to_string());
		}
		if self.transaction_identifier_value.trim().is_empty() {
			return Err("Monitoring spec value must not be empty".to_string());
		}
		Ok(())
	}
}
