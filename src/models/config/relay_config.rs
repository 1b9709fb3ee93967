use std::path::Path;

use crate::models::RelayConfig;

use super::{error::ConfigError, read_json};

impl RelayConfig {
	/// Default location of the relay settings file
	pub const DEFAULT_PATH: &'static str = "config/relay.json";

	/// Loads relay settings, falling back to defaults when the file does not exist
	pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
		let path = path.unwrap_or(Path::new(Self::DEFAULT_PATH));
		if !path.exists() {
			tracing::info!(path = %path.display(), "No relay settings file, using defaults");
			return Ok(Self::default());
		}

		let config: Self = read_json(path)?;
		config.validate().map_err(ConfigError::validation_error)?;
		Ok(config)
	}

	/// Instance id, generating one when the settings do not name this instance
	pub fn resolve_instance_id(&self) -> String {
		self.instance_id
			.clone()
			.filter(|id| !id.trim().is_empty())
			.unwrap_or_else(|| format!("relay-{}", uuid::Uuid::new_v4()))
	}
}
