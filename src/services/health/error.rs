//! Health supervision error types.

use log::error;
use std::{error::Error, fmt};

use crate::services::{blockchain::BlockChainError, blockwatcher::BlockWatcherError};

/// Errors raised while restoring a node's block stream
#[derive(Debug)]
pub enum HealthError {
	/// The node transport could not be re-established
	TransportError(String),
	/// The block stream could not be restarted
	ResubscribeError(String),
}

impl HealthError {
	fn format_message(&self) -> String {
		match self {
			Self::TransportError(msg) => format!("Transport error: {}", msg),
			Self::ResubscribeError(msg) => format!("Resubscribe error: {}", msg),
		}
	}

	pub fn transport_error(msg: impl Into<String>) -> Self {
		let error = Self::TransportError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn resubscribe_error(msg: impl Into<String>) -> Self {
		let error = Self::ResubscribeError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for HealthError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for HealthError {}

impl From<BlockChainError> for HealthError {
	fn from(err: BlockChainError) -> Self {
		Self::transport_error(err.to_string())
	}
}

impl From<BlockWatcherError> for HealthError {
	fn from(err: BlockWatcherError) -> Self {
		Self::resubscribe_error(err.to_string())
	}
}
