//! Chain event relay entry point.
//!
//! This binary loads the configuration directory, starts the relay for every configured
//! node and runs until interrupted.
//!
//! # Flow
//! 1. Loads relay settings, nodes, filters and monitoring specs
//! 2. Restores persisted subscriptions and registers configured ones
//! 3. Starts a block subscription, health supervisor and matching pipeline per node
//! 4. Broadcasts blocks, matched contract events and matched transactions
//! 5. Handles graceful shutdown on Ctrl+C

use chain_event_relay::{
	bootstrap::{Relay, RelayConfiguration},
	utils::{
		logging::setup_logging, metrics::server::create_metrics_server, DEFAULT_CONFIG_DIR,
		DEFAULT_METRICS_ADDRESS,
	},
};

use clap::{Arg, Command};
use dotenvy::dotenv;
use std::{
	env::{set_var, var},
	path::PathBuf,
};
use tracing::{error, info};

/// Main entry point for the relay.
///
/// # Errors
/// Returns an error if the configuration cannot be loaded or the relay cannot start.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let matches = Command::new("chain-event-relay")
		.version(env!("CARGO_PKG_VERSION"))
		.about(
			"Watches blockchain nodes for new blocks, matches contract events and transactions \
			 against registered filters and republishes them to downstream consumers.",
		)
		.arg(
			Arg::new("log-file")
				.long("log-file")
				.help("Write logs to file instead of stdout")
				.action(clap::ArgAction::SetTrue),
		)
		.arg(
			Arg::new("log-level")
				.long("log-level")
				.help("Set log level (trace, debug, info, warn, error)")
				.value_name("LEVEL"),
		)
		.arg(
			Arg::new("log-path")
				.long("log-path")
				.help("Path to store log files (default: logs/)")
				.value_name("PATH"),
		)
		.arg(
			Arg::new("metrics-address")
				.long("metrics-address")
				.help("Address to start the metrics server on (default: 127.0.0.1:8081)")
				.value_name("HOST:PORT"),
		)
		.arg(
			Arg::new("metrics")
				.long("metrics")
				.help("Enable metrics server")
				.action(clap::ArgAction::SetTrue),
		)
		.arg(
			Arg::new("config-dir")
				.long("config-dir")
				.help("Directory holding relay.json, nodes/, filters/ and monitors/ (default: config/)")
				.value_name("DIR"),
		)
		.arg(
			Arg::new("check")
				.long("check")
				.help("Validate the configuration and exit")
				.action(clap::ArgAction::SetTrue),
		)
		.get_matches();

	// Load environment variables from .env file
	dotenv().ok();

	// CLI options only apply when the corresponding variables are not already set
	if matches.get_flag("log-file") && var("LOG_MODE").is_err() {
		set_var("LOG_MODE", "file");
	}

	if let Some(level) = matches.get_one::<String>("log-level") {
		if var("LOG_LEVEL").is_err() {
			set_var("LOG_LEVEL", level);
		}
	}

	if let Some(path) = matches.get_one::<String>("log-path") {
		if var("LOG_DATA_DIR").is_err() {
			set_var("LOG_DATA_DIR", path);
		}
	}

	setup_logging().unwrap_or_else(|e| {
		eprintln!("Failed to setup logging: {}", e);
	});

	let config_dir = matches
		.get_one::<String>("config-dir")
		.cloned()
		.or_else(|| var("CONFIG_DIR").ok())
		.map(PathBuf::from)
		.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));

	let config = RelayConfiguration::load(&config_dir).map_err(|e| {
		anyhow::anyhow!(
			"Failed to load configuration from {}: {}",
			config_dir.display(),
			e
		)
	})?;

	if matches.get_flag("check") {
		config
			.relay
			.validate()
			.map_err(|e| anyhow::anyhow!("Invalid relay settings: {}", e))?;
		info!(
			nodes = config.nodes.len(),
			filters = config.filters.len(),
			monitors = config.monitors.len(),
			"Configuration is valid"
		);
		return Ok(());
	}

	if config.nodes.is_empty() {
		info!("No nodes configured. Exiting...");
		return Ok(());
	}

	let metrics_enabled =
		matches.get_flag("metrics") || var("METRICS_ENABLED").map(|v| v == "true").unwrap_or(false);

	let metrics_address = var("METRICS_PORT")
		.ok()
		.filter(|_| var("IN_DOCKER").unwrap_or_default() == "true")
		.map(|port| format!("0.0.0.0:{}", port))
		.or_else(|| matches.get_one::<String>("metrics-address").cloned())
		.unwrap_or_else(|| DEFAULT_METRICS_ADDRESS.to_string());

	let metrics_server = if metrics_enabled {
		info!("Metrics server enabled, starting on {}", metrics_address);
		match create_metrics_server(metrics_address) {
			Ok(server) => Some(server),
			Err(e) => {
				error!("Failed to create metrics server: {}", e);
				None
			}
		}
	} else {
		info!("Metrics server disabled. Use --metrics flag or METRICS_ENABLED=true to enable");
		None
	};

	let relay = Relay::builder(config)
		.start()
		.await
		.map_err(|e| anyhow::anyhow!("Failed to start relay: {}", e))?;

	info!("Relay started. Press Ctrl+C to shutdown");

	let ctrl_c = tokio::signal::ctrl_c();
	if let Some(metrics_future) = metrics_server {
		tokio::select! {
			result = ctrl_c => {
				if let Err(e) = result {
					error!("Error waiting for Ctrl+C: {}", e);
				}
				info!("Shutdown signal received, stopping services...");
			}
			result = metrics_future => {
				if let Err(e) = result {
					error!("Metrics server error: {}", e);
				}
				info!("Metrics server stopped, shutting down services...");
			}
		}
	} else {
		let _ = ctrl_c.await;
		info!("Shutdown signal received, stopping services...");
	}

	relay.shutdown().await;
	Ok(())
}
