use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::utils::DEFAULT_BLOCK_CACHE_SIZE;

/// Process-wide relay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
	/// Identity of this instance on the cluster bus; generated when absent
	pub instance_id: Option<String>,
	/// Recent blocks kept per node for resume lookups
	pub block_cache_size: usize,
	/// Directory for checkpoints and persisted subscriptions
	pub storage_path: PathBuf,
	pub reconnect: ReconnectConfig,
	pub cluster: ClusterConfig,
	pub destinations: DestinationConfig,
	pub broadcaster: BroadcasterConfig,
}

impl Default for RelayConfig {
	fn default() -> Self {
		Self {
			instance_id: None,
			block_cache_size: DEFAULT_BLOCK_CACHE_SIZE,
			storage_path: PathBuf::from("data"),
			reconnect: ReconnectConfig::default(),
			cluster: ClusterConfig::default(),
			destinations: DestinationConfig::default(),
			broadcaster: BroadcasterConfig::default(),
		}
	}
}

impl RelayConfig {
	pub fn validate(&self) -> Result<(), String> {
		if self.block_cache_size == 0 {
			return Err("block_cache_size must be greater than 0".to_string());
		}
		if self.reconnect.initial_delay_ms > self.reconnect.max_delay_ms {
			return Err("reconnect.initial_delay_ms must not exceed max_delay_ms".to_string());
		}
		if self.reconnect.max_attempts == Some(0) {
			return Err("reconnect.max_attempts must be greater than 0 when set".to_string());
		}
		if self.cluster.retry_attempts == 0 {
			return Err("cluster.retry_attempts must be greater than 0".to_string());
		}
		if self.cluster.partition_count == 0 {
			return Err("cluster.partition_count must be greater than 0".to_string());
		}
		if let BroadcasterConfig::Webhook { url, .. } = &self.broadcaster {
			url::Url::parse(url).map_err(|e| format!("Invalid broadcaster url '{}': {}", url, e))?;
		}
		Ok(())
	}
}

/// Backoff between node reconnection attempts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
	pub initial_delay_ms: u64,
	pub max_delay_ms: u64,
	/// Attempts per reconnection round; unbounded when absent
	pub max_attempts: Option<usize>,
}

impl Default for ReconnectConfig {
	fn default() -> Self {
		Self {
			initial_delay_ms: 1_000,
			max_delay_ms: 30_000,
			max_attempts: Some(10),
		}
	}
}

impl ReconnectConfig {
	pub fn initial_delay(&self) -> Duration {
		Duration::from_millis(self.initial_delay_ms)
	}

	pub fn max_delay(&self) -> Duration {
		Duration::from_millis(self.max_delay_ms)
	}
}

/// Retry policy and partitioning of the cluster bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
	pub retry_attempts: usize,
	pub initial_backoff_ms: u64,
	pub max_backoff_ms: u64,
	pub partition_count: u32,
}

impl Default for ClusterConfig {
	fn default() -> Self {
		Self {
			retry_attempts: 5,
			initial_backoff_ms: 500,
			max_backoff_ms: 10_000,
			partition_count: 3,
		}
	}
}

impl ClusterConfig {
	pub fn initial_backoff(&self) -> Duration {
		Duration::from_millis(self.initial_backoff_ms)
	}

	pub fn max_backoff(&self) -> Duration {
		Duration::from_millis(self.max_backoff_ms)
	}
}

/// Named destinations for each kind of broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationConfig {
	pub block: String,
	pub contract_event: String,
	pub transaction: String,
	pub message: String,
}

impl Default for DestinationConfig {
	fn default() -> Self {
		Self {
			block: "block-events".to_string(),
			contract_event: "contract-events".to_string(),
			transaction: "transaction-events".to_string(),
			message: "relay-messages".to_string(),
		}
	}
}

/// Where broadcasts are published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcasterConfig {
	/// In-process channel, for embedding the relay as a library
	Channel { capacity: usize },
	/// HTTP POST of every envelope to `{url}/{destination}`
	Webhook { url: String, secret: Option<String> },
}

impl Default for BroadcasterConfig {
	fn default() -> Self {
		Self::Channel { capacity: 1024 }
	}
}
