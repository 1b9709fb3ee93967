use serde::{Deserialize, Serialize};
use std::fmt;

/// Health of a monitored node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeHealthState {
	/// Connected and receiving fresh blocks
	#[default]
	Active,
	/// Connected, the node reports it is still catching up
	Syncing,
	/// Probe failed or reconnection attempts were exhausted
	Failed,
	/// A reconnection round is in progress
	Reconnecting,
}

impl NodeHealthState {
	pub fn is_healthy(&self) -> bool {
		matches!(self, Self::Active | Self::Syncing)
	}

	/// Numeric encoding exported to the node health gauge
	pub fn as_gauge_value(&self) -> f64 {
		match self {
			Self::Active => 0.0,
			Self::Syncing => 1.0,
			Self::Reconnecting => 2.0,
			Self::Failed => 3.0,
		}
	}
}

impl fmt::Display for NodeHealthState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Active => "ACTIVE",
			Self::Syncing => "SYNCING",
			Self::Failed => "FAILED",
			Self::Reconnecting => "RECONNECTING",
		};
		f.write_str(name)
	}
}
