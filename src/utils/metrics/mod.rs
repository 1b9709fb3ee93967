//! Metrics module for the relay.
//!
//! - This module contains the global Prometheus registry.
//! - Defines the relay's counters and gauges.
//! - Components update these directly as they process blocks, messages and health probes.

pub mod server;
use lazy_static::lazy_static;
use prometheus::{
	Encoder, Gauge, GaugeVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::models::NodeHealthState;

lazy_static! {
	// Global Prometheus registry.
	pub static ref REGISTRY: Registry = Registry::new();

	// Counter of blocks delivered to listeners, per node.
	pub static ref BLOCKS_PROCESSED: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("relay_blocks_processed_total", "Blocks delivered to listeners"),
			&["node"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	// Counter of contract events broadcast, per node.
	pub static ref CONTRACT_EVENTS_BROADCAST: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("relay_contract_events_broadcast_total", "Contract events broadcast"),
			&["node"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	// Counter of matched transactions broadcast, per node.
	pub static ref TRANSACTIONS_BROADCAST: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("relay_transactions_broadcast_total", "Matched transactions broadcast"),
			&["node"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	// Counter of envelopes that could not be published.
	pub static ref BROADCAST_FAILURES: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("relay_broadcast_failures_total", "Envelopes that failed to publish"),
			&["type"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	// Counter of cluster messages dropped after exhausting retries or lost to subscriber lag.
	pub static ref CLUSTER_MESSAGES_DROPPED: IntCounter = {
		let counter = IntCounter::new(
			"relay_cluster_messages_dropped_total",
			"Cluster control messages dropped after retries or lost to lag"
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	// Counter of reconnect attempts, per node.
	pub static ref RECONNECT_ATTEMPTS: IntCounterVec = {
		let counter = IntCounterVec::new(
			Opts::new("relay_reconnect_attempts_total", "Reconnect attempts"),
			&["node"]
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};

	// Gauge Vector for node health (0 active, 1 syncing, 2 reconnecting, 3 failed)
	pub static ref NODE_HEALTH: GaugeVec = {
		let gauge = GaugeVec::new(
			Opts::new("relay_node_health", "Node health state"),
			&["node"]
		).unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	// Gauge for number of registered contract event filters
	pub static ref FILTERS_REGISTERED: Gauge = {
		let gauge = Gauge::new("relay_filters_registered", "Registered contract event filters").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	// Gauge for number of registered transaction monitoring specs
	pub static ref MONITORS_REGISTERED: Gauge = {
		let gauge = Gauge::new("relay_monitors_registered", "Registered transaction monitors").unwrap();
		REGISTRY.register(Box::new(gauge.clone())).unwrap();
		gauge
	};

	// Counter of bootstrap entries that failed to register
	pub static ref BOOTSTRAP_FAILURES: IntCounter = {
		let counter = IntCounter::new(
			"relay_bootstrap_failures_total",
			"Persisted or configured entries that failed to register at startup"
		).unwrap();
		REGISTRY.register(Box::new(counter.clone())).unwrap();
		counter
	};
}

/// Gather all metrics and encode into the provided format.
pub fn gather_metrics() -> Result<Vec<u8>, Box<dyn std::error::Error>> {
	let encoder = TextEncoder::new();
	let metric_families = REGISTRY.gather();
	let mut buffer = Vec::new();
	encoder.encode(&metric_families, &mut buffer)?;
	Ok(buffer)
}

/// Records the health state of a node.
pub fn record_node_health(node_name: &str, state: NodeHealthState) {
	NODE_HEALTH
		.with_label_values(&[node_name])
		.set(state.as_gauge_value());
}

/// Updates the registry size gauges.
pub fn update_registry_metrics(filters: usize, monitors: usize) {
	FILTERS_REGISTERED.set(filters as f64);
	MONITORS_REGISTERED.set(monitors as f64);
}
