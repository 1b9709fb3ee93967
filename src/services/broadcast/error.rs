//! Broadcast error types and handling.
//!
//! Provides error types for publishing envelopes to downstream consumers,
//! including network issues and configuration problems.

use log::error;
use std::{error::Error, fmt};

/// Represents possible errors while publishing an envelope
#[derive(Debug)]
pub enum BroadcastError {
	/// The destination could not be reached or rejected the envelope
	NetworkError(String),
	/// The sink is misconfigured
	ConfigError(String),
	/// The envelope or its key could not be encoded
	SerializationError(String),
	/// Internal errors (e.g., failed to sign a request)
	InternalError(String),
}

impl BroadcastError {
	/// Formats the error message based on the error type
	fn format_message(&self) -> String {
		match self {
			Self::NetworkError(msg) => format!("Network error: {}", msg),
			Self::ConfigError(msg) => format!("Config error: {}", msg),
			Self::SerializationError(msg) => format!("Serialization error: {}", msg),
			Self::InternalError(msg) => format!("Internal error: {}", msg),
		}
	}

	/// Creates a new network error with logging
	pub fn network_error(msg: impl Into<String>) -> Self {
		let error = Self::NetworkError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new configuration error with logging
	pub fn config_error(msg: impl Into<String>) -> Self {
		let error = Self::ConfigError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new serialization error with logging
	pub fn serialization_error(msg: impl Into<String>) -> Self {
		let error = Self::SerializationError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new internal error with logging
	pub fn internal_error(msg: impl Into<String>) -> Self {
		let error = Self::InternalError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl From<reqwest::Error> for BroadcastError {
	fn from(error: reqwest::Error) -> Self {
		Self::network_error(error.to_string())
	}
}

impl From<reqwest_middleware::Error> for BroadcastError {
	fn from(error: reqwest_middleware::Error) -> Self {
		Self::network_error(error.to_string())
	}
}

impl From<serde_json::Error> for BroadcastError {
	fn from(error: serde_json::Error) -> Self {
		Self::serialization_error(error.to_string())
	}
}

impl fmt::Display for BroadcastError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for BroadcastError {}
