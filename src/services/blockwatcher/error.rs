//! Block watcher error types and handling.

use log::error;
use std::error::Error;
use std::fmt;

/// Errors raised while producing a node's block stream
#[derive(Debug)]
pub enum BlockWatcherError {
	/// The node transport failed; the subscription handle that hit it has ended
	NetworkError(String),
	/// A block could not be processed
	ProcessingError(String),
	/// Checkpoint storage failed
	StorageError(String),
	/// The subscription could not be started
	SubscriptionError(String),
}

impl BlockWatcherError {
	fn format_message(&self) -> String {
		match self {
			Self::NetworkError(msg) => format!("Network error: {}", msg),
			Self::ProcessingError(msg) => format!("Processing error: {}", msg),
			Self::StorageError(msg) => format!("Storage error: {}", msg),
			Self::SubscriptionError(msg) => format!("Subscription error: {}", msg),
		}
	}

	pub fn network_error(msg: impl Into<String>) -> Self {
		let error = Self::NetworkError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn processing_error(msg: impl Into<String>) -> Self {
		let error = Self::ProcessingError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn storage_error(msg: impl Into<String>) -> Self {
		let error = Self::StorageError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn subscription_error(msg: impl Into<String>) -> Self {
		let error = Self::SubscriptionError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for BlockWatcherError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for BlockWatcherError {}
