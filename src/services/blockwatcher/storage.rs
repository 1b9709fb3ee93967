//! Durable per-node checkpoints.
//!
//! A checkpoint is the number of the last block delivered to every listener of a node.
//! Resumed subscriptions start at the checkpoint itself, so it is redelivered.

use async_trait::async_trait;
use std::path::PathBuf;

use crate::services::blockwatcher::BlockWatcherError;

/// Interface for checkpoint storage
#[async_trait]
pub trait BlockStorage: Send + Sync {
	/// Retrieves the last processed block number for a node
	///
	/// # Returns
	/// * `Result<Option<u64>, BlockWatcherError>` - The checkpoint, `None` if the node was
	///   never processed
	async fn get_last_processed_block(
		&self,
		node_name: &str,
	) -> Result<Option<u64>, BlockWatcherError>;

	/// Saves the last processed block number for a node
	async fn save_last_processed_block(
		&self,
		node_name: &str,
		block: u64,
	) -> Result<(), BlockWatcherError>;

	/// Removes the checkpoint of a node
	async fn delete_checkpoint(&self, node_name: &str) -> Result<(), BlockWatcherError>;
}

/// File-based checkpoint storage
///
/// Stores one `{node}_last_block.txt` file per node under `{storage_path}/checkpoints`.
pub struct FileBlockStorage {
	storage_path: PathBuf,
}

impl FileBlockStorage {
	/// Creates storage rooted at the relay's data directory
	pub fn new(storage_path: impl Into<PathBuf>) -> Self {
		FileBlockStorage {
			storage_path: storage_path.into().join("checkpoints"),
		}
	}

	fn checkpoint_path(&self, node_name: &str) -> PathBuf {
		self.storage_path
			.join(format!("{}_last_block.txt", node_name))
	}
}

impl Default for FileBlockStorage {
	fn default() -> Self {
		Self::new("data")
	}
}

#[async_trait]
impl BlockStorage for FileBlockStorage {
	async fn get_last_processed_block(
		&self,
		node_name: &str,
	) -> Result<Option<u64>, BlockWatcherError> {
		let file_path = self.checkpoint_path(node_name);

		if !file_path.exists() {
			return Ok(None);
		}

		let content = tokio::fs::read_to_string(&file_path).await.map_err(|e| {
			BlockWatcherError::storage_error(format!(
				"Failed to read checkpoint {}: {}",
				file_path.display(),
				e
			))
		})?;
		let block_number = content.trim().parse().map_err(|e| {
			BlockWatcherError::storage_error(format!(
				"Invalid checkpoint in {}: {}",
				file_path.display(),
				e
			))
		})?;
		Ok(Some(block_number))
	}

	async fn save_last_processed_block(
		&self,
		node_name: &str,
		block: u64,
	) -> Result<(), BlockWatcherError> {
		tokio::fs::create_dir_all(&self.storage_path)
			.await
			.map_err(|e| {
				BlockWatcherError::storage_error(format!(
					"Failed to create {}: {}",
					self.storage_path.display(),
					e
				))
			})?;

		// Write then rename so a crash never leaves a truncated checkpoint
		let file_path = self.checkpoint_path(node_name);
		let tmp_path = file_path.with_extension("tmp");
		tokio::fs::write(&tmp_path, block.to_string())
			.await
			.map_err(|e| {
				BlockWatcherError::storage_error(format!("Failed to write checkpoint: {}", e))
			})?;
		tokio::fs::rename(&tmp_path, &file_path)
			.await
			.map_err(|e| {
				BlockWatcherError::storage_error(format!("Failed to move checkpoint: {}", e))
			})?;
		Ok(())
	}

	async fn delete_checkpoint(&self, node_name: &str) -> Result<(), BlockWatcherError> {
		let file_path = self.checkpoint_path(node_name);
		if !file_path.exists() {
			return Ok(());
		}
		tokio::fs::remove_file(&file_path).await.map_err(|e| {
			BlockWatcherError::storage_error(format!("Failed to delete checkpoint: {}", e))
		})
	}
}
