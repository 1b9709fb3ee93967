//! Persisted subscription store.
//!
//! Filters and monitoring specs registered at runtime are persisted so a restarted relay
//! picks them up again. Reading is needed at bootstrap; writing is a separate capability
//! implemented only by stores that support it.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::{
	models::{ContractEventFilter, TransactionMonitoringSpec},
	repositories::error::RepositoryError,
};

/// Read access to persisted subscriptions
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
	async fn load_filters(&self) -> Result<Vec<ContractEventFilter>, RepositoryError>;

	async fn load_monitors(&self) -> Result<Vec<TransactionMonitoringSpec>, RepositoryError>;
}

/// Write access to persisted subscriptions
#[async_trait]
pub trait WritableSubscriptionStore: SubscriptionStore {
	async fn save_filter(&self, filter: &ContractEventFilter) -> Result<(), RepositoryError>;

	/// Deleting an id that is not stored succeeds
	async fn delete_filter(&self, filter_id: &str) -> Result<(), RepositoryError>;

	async fn save_monitor(&self, spec: &TransactionMonitoringSpec) -> Result<(), RepositoryError>;

	/// Deleting an id that is not stored succeeds
	async fn delete_monitor(&self, spec_id: &str) -> Result<(), RepositoryError>;
}

/// Stores one JSON file per record under `{storage_path}/subscriptions/{filters,monitors}`
pub struct FileSubscriptionStore {
	filters_path: PathBuf,
	monitors_path: PathBuf,
}

impl FileSubscriptionStore {
	pub fn new(storage_path: impl Into<PathBuf>) -> Self {
		let root = storage_path.into().join("subscriptions");
		Self {
			filters_path: root.join("filters"),
			monitors_path: root.join("monitors"),
		}
	}

	fn record_path(dir: &Path, id: &str) -> Result<PathBuf, RepositoryError> {
		if id.is_empty()
			|| !id
				.chars()
				.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
		{
			return Err(RepositoryError::validation_error(format!(
				"'{}' cannot be used as a record id",
				id
			)));
		}
		Ok(dir.join(format!("{}.json", id)))
	}

	async fn load_records<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, RepositoryError> {
		if !dir.exists() {
			return Ok(Vec::new());
		}

		let mut paths = Vec::new();
		let mut entries = tokio::fs::read_dir(dir).await?;
		while let Some(entry) = entries.next_entry().await? {
			let path = entry.path();
			if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
				paths.push(path);
			}
		}
		paths.sort();

		let mut records = Vec::with_capacity(paths.len());
		for path in paths {
			let content = tokio::fs::read_to_string(&path).await?;
			match serde_json::from_str(&content) {
				Ok(record) => records.push(record),
				Err(e) => {
					warn!(path = %path.display(), error = %e, "Skipping unreadable persisted record")
				}
			}
		}
		Ok(records)
	}

	async fn write_record<T: Serialize + Sync>(
		dir: &Path,
		id: &str,
		record: &T,
	) -> Result<(), RepositoryError> {
		let path = Self::record_path(dir, id)?;
		tokio::fs::create_dir_all(dir).await.map_err(|e| {
			RepositoryError::store_error(format!("Failed to create {}: {}", dir.display(), e))
		})?;

		let content = serde_json::to_vec_pretty(record)
			.map_err(|e| RepositoryError::internal_error(format!("Failed to encode {}: {}", id, e)))?;
		let tmp_path = path.with_extension("tmp");
		tokio::fs::write(&tmp_path, content)
			.await
			.map_err(|e| RepositoryError::store_error(format!("Failed to write {}: {}", id, e)))?;
		tokio::fs::rename(&tmp_path, &path)
			.await
			.map_err(|e| RepositoryError::store_error(format!("Failed to move {}: {}", id, e)))
	}

	async fn delete_record(dir: &Path, id: &str) -> Result<(), RepositoryError> {
		let path = Self::record_path(dir, id)?;
		match tokio::fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(RepositoryError::store_error(format!(
				"Failed to delete {}: {}",
				id, e
			))),
		}
	}
}

impl Default for FileSubscriptionStore {
	fn default() -> Self {
		Self::new("data")
	}
}

#[async_trait]
impl SubscriptionStore for FileSubscriptionStore {
	async fn load_filters(&self) -> Result<Vec<ContractEventFilter>, RepositoryError> {
		Self::load_records(&self.filters_path).await
	}

	async fn load_monitors(&self) -> Result<Vec<TransactionMonitoringSpec>, RepositoryError> {
		Self::load_records(&self.monitors_path).await
	}
}

#[async_trait]
impl WritableSubscriptionStore for FileSubscriptionStore {
	async fn save_filter(&self, filter: &ContractEventFilter) -> Result<(), RepositoryError> {
		Self::write_record(&self.filters_path, &filter.id, filter).await
	}

	async fn delete_filter(&self, filter_id: &str) -> Result<(), RepositoryError> {
		Self::delete_record(&self.filters_path, filter_id).await
	}

	async fn save_monitor(&self, spec: &TransactionMonitoringSpec) -> Result<(), RepositoryError> {
		Self::write_record(&self.monitors_path, &spec.id, spec).await
	}

	async fn delete_monitor(&self, spec_id: &str) -> Result<(), RepositoryError> {
		Self::delete_record(&self.monitors_path, spec_id).await
	}
}
