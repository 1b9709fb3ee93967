//! Matching error types and handling.
//!
//! Errors raised while compiling criteria or running a matching pass. Criteria errors are
//! only ever returned at registration time; pass errors are logged and never stop a pass.

use log::error;
use std::{error::Error, fmt};

use crate::services::blockchain::BlockChainError;

/// Represents possible errors during block matching
#[derive(Debug)]
pub enum FilterError {
	/// The spec type has no matching criteria
	UnsupportedCriteria(String),

	/// The spec value cannot be parsed for its type
	InvalidCriteria(String),

	/// A node request made during a pass failed
	NetworkError(String),

	/// Internal errors within the matching engine
	InternalError(String),
}

impl FilterError {
	fn format_message(&self) -> String {
		match self {
			FilterError::UnsupportedCriteria(msg) => format!("Unsupported criteria: {}", msg),
			FilterError::InvalidCriteria(msg) => format!("Invalid criteria: {}", msg),
			FilterError::NetworkError(msg) => format!("Network error: {}", msg),
			FilterError::InternalError(msg) => format!("Internal error: {}", msg),
		}
	}

	pub fn unsupported_criteria(msg: impl Into<String>) -> Self {
		let error = FilterError::UnsupportedCriteria(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn invalid_criteria(msg: impl Into<String>) -> Self {
		let error = FilterError::InvalidCriteria(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn network_error(msg: impl Into<String>) -> Self {
		let error = FilterError::NetworkError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = FilterError::InternalError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for FilterError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for FilterError {}

impl From<BlockChainError> for FilterError {
	fn from(err: BlockChainError) -> Self {
		FilterError::network_error(err.to_string())
	}
}
