//! Blockchain error types and handling.
//!
//! Errors raised while talking to a ledger node. Transport failures are the only kind that
//! should drive reconnection; malformed data is dropped by callers.

use crate::services::blockwatcher::BlockWatcherError;

use log::error;

/// Represents possible errors that can occur during node operations
#[derive(Debug)]
pub enum BlockChainError {
	/// The node could not be reached or the connection broke
	ConnectionError(String),

	/// The node rejected a request or returned a JSON-RPC error
	RequestError(String),

	/// The node answered with data that does not describe a valid block, log or receipt
	MalformedData(String),

	/// When a requested block cannot be found on the node
	///
	/// Contains the block number that was not found
	BlockNotFound(u64),

	/// The client does not offer the requested capability
	Unsupported(String),

	/// Internal errors within the node client
	InternalError(String),
}

impl BlockChainError {
	/// Formats the error message based on the error type
	fn format_message(&self) -> String {
		match self {
			Self::ConnectionError(msg) => format!("Connection error: {}", msg),
			Self::RequestError(msg) => format!("Request error: {}", msg),
			Self::MalformedData(msg) => format!("Malformed data: {}", msg),
			Self::BlockNotFound(number) => format!("Block not found: {}", number),
			Self::Unsupported(msg) => format!("Unsupported operation: {}", msg),
			Self::InternalError(msg) => format!("Internal error: {}", msg),
		}
	}

	/// Creates a new connection error with logging
	pub fn connection_error(msg: impl Into<String>) -> Self {
		let error = Self::ConnectionError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new request error with logging
	pub fn request_error(msg: impl Into<String>) -> Self {
		let error = Self::RequestError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new malformed data error with logging
	pub fn malformed_data(msg: impl Into<String>) -> Self {
		let error = Self::MalformedData(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new block not found error with logging
	pub fn block_not_found(number: u64) -> Self {
		let error = Self::BlockNotFound(number);
		error!("{}", error.format_message());
		error
	}

	/// Creates a new unsupported operation error with logging
	pub fn unsupported(msg: impl Into<String>) -> Self {
		let error = Self::Unsupported(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new internal error with logging
	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = Self::InternalError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Whether the error means the node transport is unusable
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::ConnectionError(_))
	}
}

// Standard error trait implementations
impl std::fmt::Display for BlockChainError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl std::error::Error for BlockChainError {}

/// Conversion from BlockChainError to BlockWatcherError
impl From<BlockChainError> for BlockWatcherError {
	fn from(err: BlockChainError) -> Self {
		if err.is_transport() {
			BlockWatcherError::network_error(err.to_string())
		} else {
			BlockWatcherError::processing_error(err.to_string())
		}
	}
}
