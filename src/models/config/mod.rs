//! Configuration loading and validation.
//!
//! Every configured entity lives in its own JSON file inside a per-kind directory
//! (`config/nodes`, `config/filters`, `config/monitors`). Relay-wide settings live in
//! `config/relay.json`.

use serde::de::DeserializeOwned;
use std::path::Path;

mod error;
mod filter_config;
mod monitor_config;
mod node_config;
mod relay_config;

pub use error::ConfigError;

/// Common interface for loading configuration files
pub trait ConfigLoader: Sized {
	/// Directory used when no explicit path is given
	const DEFAULT_DIR: &'static str;

	fn load_from_path(path: &Path) -> Result<Self, ConfigError>;

	fn validate(&self) -> Result<(), String>;

	/// Loads every JSON file of the directory, keyed by file stem.
	///
	/// Files that fail to parse or validate are skipped with a warning so one bad file does
	/// not keep the relay from starting.
	fn load_all<T>(path: Option<&Path>) -> Result<T, ConfigError>
	where
		T: FromIterator<(String, Self)>,
	{
		let dir = path.unwrap_or(Path::new(Self::DEFAULT_DIR));
		let mut pairs = Vec::new();

		if !dir.exists() {
			return Err(ConfigError::file_error(dir, "directory not found"));
		}

		let mut paths = std::fs::read_dir(dir)
			.and_then(|entries| {
				entries
					.map(|entry| entry.map(|e| e.path()))
					.collect::<Result<Vec<_>, _>>()
			})
			.map_err(|e| ConfigError::file_error(dir, e))?;
		paths.sort();

		for path in paths {
			if !Self::is_json_file(&path) {
				continue;
			}

			let name = path
				.file_stem()
				.and_then(|s| s.to_str())
				.unwrap_or("unknown")
				.to_string();

			match Self::load_from_path(&path) {
				Ok(item) => pairs.push((name, item)),
				Err(e) => {
					tracing::warn!(path = %path.display(), error = %e, "Skipping invalid config file")
				}
			}
		}

		Ok(T::from_iter(pairs))
	}

	/// Parses and validates one JSON file
	fn load_json(path: &Path) -> Result<Self, ConfigError>
	where
		Self: DeserializeOwned,
	{
		let config: Self = read_json(path)?;

		if let Err(validation_error) = config.validate() {
			return Err(ConfigError::validation_error(validation_error));
		}

		Ok(config)
	}

	fn is_json_file(path: &Path) -> bool {
		path.extension()
			.map(|ext| ext.to_string_lossy().to_lowercase() == "json")
			.unwrap_or(false)
	}
}

/// Reads one JSON document, tagging failures with the file path
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
	let file = std::fs::File::open(path).map_err(|e| ConfigError::file_error(path, e))?;
	serde_json::from_reader(std::io::BufReader::new(file))
		.map_err(|e| ConfigError::parse_error(path, e))
}
