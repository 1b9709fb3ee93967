//! Constants shared across the relay.

use std::time::Duration;

/// Recent blocks remembered per node when no relay settings are loaded
pub const DEFAULT_BLOCK_CACHE_SIZE: usize = 100;

/// Default bind address of the metrics server
pub const DEFAULT_METRICS_ADDRESS: &str = "127.0.0.1:8081";

/// Default configuration directory
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Retries of the node reachability check made when a subscription is registered
pub const REGISTRY_ACTIVATION_ATTEMPTS: usize = 3;

/// Delay before the first retry of the node reachability check
pub const REGISTRY_ACTIVATION_DELAY: Duration = Duration::from_millis(200);
