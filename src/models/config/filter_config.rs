use std::path::Path;

use crate::models::{ConfigLoader, ContractEventFilter};

use super::error::ConfigError;

impl ConfigLoader for ContractEventFilter {
	const DEFAULT_DIR: &'static str = "config/filters";

	/// Filters without an id take the file stem, so a restart yields the same id
	fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
		let mut filter = Self::load_json(path)?;
		if filter.id.trim().is_empty() {
			filter.id = path
				.file_stem()
				.and_then(|stem| stem.to_str())
				.filter(|stem| {
					stem.chars()
						.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
				})
				.unwrap_or_default()
				.to_string();
		}
		filter.ensure_id();
		Ok(filter)
	}

	fn validate(&self) -> Result<(), String> {
		ContractEventFilter::validate(self)
	}
}
