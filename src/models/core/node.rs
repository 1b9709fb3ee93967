use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Kind of ledger node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
	/// Regular node, may offer push delivery of new blocks
	#[default]
	Normal,
	/// Mirror node exposing historical block data through polling only
	Mirror,
}

/// How blocks are obtained from a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStrategyType {
	/// Poll the node on a fixed interval
	#[default]
	Poll,
	/// Let the node push new blocks
	Push,
}

fn default_polling_interval_ms() -> u64 {
	5_000
}

fn default_health_check_interval_ms() -> u64 {
	10_000
}

fn default_syncing_threshold_secs() -> u64 {
	60
}

/// A monitored node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
	pub name: String,
	#[serde(default)]
	pub node_type: NodeType,
	pub url: String,
	#[serde(default)]
	pub block_strategy: BlockStrategyType,
	#[serde(default = "default_polling_interval_ms")]
	pub polling_interval_ms: u64,
	#[serde(default = "default_health_check_interval_ms")]
	pub health_check_interval_ms: u64,
	/// Seconds without a new block before the node is considered stale
	#[serde(default = "default_syncing_threshold_secs")]
	pub syncing_threshold_secs: u64,
	/// Configured start block; the checkpoint wins when it is further ahead
	#[serde(default)]
	pub start_block: Option<u64>,
}

impl Node {
	pub fn polling_interval(&self) -> Duration {
		Duration::from_millis(self.polling_interval_ms)
	}

	pub fn health_check_interval(&self) -> Duration {
		Duration::from_millis(self.health_check_interval_ms)
	}

	pub fn syncing_threshold(&self) -> Duration {
		Duration::from_secs(self.syncing_threshold_secs)
	}

	/// Strategy used for this node, decided once from its configuration.
	///
	/// Mirror nodes always poll. Normal nodes push only when configured to and when the
	/// client can deliver pushed blocks.
	pub fn effective_strategy(&self, client_supports_push: bool) -> BlockStrategyType {
		match (self.node_type, self.block_strategy, client_supports_push) {
			(NodeType::Normal, BlockStrategyType::Push, true) => BlockStrategyType::Push,
			_ => BlockStrategyType::Poll,
		}
	}
}
