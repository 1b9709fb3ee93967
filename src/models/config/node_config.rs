use std::path::Path;

use crate::models::{ConfigLoader, Node};

use super::error::ConfigError;

impl ConfigLoader for Node {
	const DEFAULT_DIR: &'static str = "config/nodes";

	fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		Self::load_json(path)
	}

	fn validate(&self) -> Result<(), String> {
		if self.name.is_empty()
			|| !self
				.name
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
		{
			return Err(
				"Node name must contain only letters, numbers, dashes and underscores".to_string(),
			);
		}

		let url = url::Url::parse(&self.url)
			.map_err(|e| format!("Invalid node url '{}': {}", self.url, e))?;
		if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
			return Err("Node url must use http, https, ws or wss".to_string());
		}

		if self.polling_interval_ms < 100 {
			return Err("polling_interval_ms must be at least 100ms".to_string());
		}

		if self.health_check_interval_ms < 100 {
			return Err("health_check_interval_ms must be at least 100ms".to_string());
		}

		if self.syncing_threshold_secs == 0 {
			return Err("syncing_threshold_secs must be greater than 0".to_string());
		}

		Ok(())
	}
}
