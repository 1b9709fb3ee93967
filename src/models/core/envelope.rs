use serde::{Deserialize, Serialize};

/// Kind of payload carried by a broadcast envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
	Block,
	ContractEvent,
	Transaction,
	Message,
}

/// Canonical envelope published to downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
	pub id: String,
	#[serde(rename = "type")]
	pub type_: MessageType,
	pub details: serde_json::Value,
	/// Milliseconds since the epoch
	pub timestamp: i64,
	pub retries: u32,
}

impl MessageEnvelope {
	pub fn new(type_: MessageType, details: serde_json::Value) -> Self {
		Self {
			id: uuid::Uuid::new_v4().to_string(),
			type_,
			details,
			timestamp: chrono::Utc::now().timestamp_millis(),
			retries: 0,
		}
	}
}
