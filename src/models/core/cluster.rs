use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::models::{ContractEventFilter, TransactionMonitoringSpec};

/// Control message exchanged between relay instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterControlMessage {
	FilterAdded(ContractEventFilter),
	FilterRemoved { filter_id: String },
	MonitorAdded(TransactionMonitoringSpec),
	MonitorRemoved { spec_id: String },
}

impl ClusterControlMessage {
	/// Id of the filter or spec the message is about
	pub fn entity_id(&self) -> &str {
		match self {
			Self::FilterAdded(filter) => &filter.id,
			Self::FilterRemoved { filter_id } => filter_id,
			Self::MonitorAdded(spec) => &spec.id,
			Self::MonitorRemoved { spec_id } => spec_id,
		}
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Self::FilterAdded(_) => "FILTER_ADDED",
			Self::FilterRemoved { .. } => "FILTER_REMOVED",
			Self::MonitorAdded(_) => "MONITOR_ADDED",
			Self::MonitorRemoved { .. } => "MONITOR_REMOVED",
		}
	}
}

/// A control message on the cluster bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEnvelope {
	pub id: String,
	/// Instance that published the message
	pub origin: String,
	/// Partition derived from the entity id, so all messages about one entity stay ordered
	pub partition: u32,
	/// Milliseconds since the epoch
	pub timestamp: i64,
	pub message: ClusterControlMessage,
}

impl ClusterEnvelope {
	pub fn new(origin: impl Into<String>, message: ClusterControlMessage, partitions: u32) -> Self {
		Self {
			id: uuid::Uuid::new_v4().to_string(),
			origin: origin.into(),
			partition: Self::partition_for(message.entity_id(), partitions),
			timestamp: chrono::Utc::now().timestamp_millis(),
			message,
		}
	}

	/// Stable partition for an entity id
	pub fn partition_for(entity_id: &str, partitions: u32) -> u32 {
		if partitions <= 1 {
			return 0;
		}
		let digest = Sha256::digest(entity_id.as_bytes());
		let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
		prefix % partitions
	}
}
