use std::path::Path;

use crate::models::{ConfigLoader, TransactionMonitoringSpec};

use super::error::ConfigError;

impl ConfigLoader for TransactionMonitoringSpec {
	const DEFAULT_DIR: &'static str = "config/monitors";

	fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let mut spec = Self::load_json(path)?;
		spec.normalize();
		Ok(spec)
	}

	fn validate(&self) -> Result<(), String> {
		TransactionMonitoringSpec::validate(self)
	}
}
