//! Cluster bus error types and handling.

use log::error;
use std::{error::Error, fmt};

/// Represents possible errors on the cluster bus
#[derive(Debug)]
pub enum ClusterError {
	/// A message could not be handed to the bus
	PublishError(String),

	/// A received message could not be applied locally
	HandlerError(String),

	/// The bus stopped delivering messages
	ChannelClosed(String),
}

impl ClusterError {
	fn format_message(&self) -> String {
		match self {
			Self::PublishError(msg) => format!("Publish error: {}", msg),
			Self::HandlerError(msg) => format!("Handler error: {}", msg),
			Self::ChannelClosed(msg) => format!("Channel closed: {}", msg),
		}
	}

	/// Creates a new publish error with logging
	pub fn publish_error(msg: impl Into<String>) -> Self {
		let error = Self::PublishError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new handler error with logging
	pub fn handler_error(msg: impl Into<String>) -> Self {
		let error = Self::HandlerError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Creates a new channel closed error with logging
	pub fn channel_closed(msg: impl Into<String>) -> Self {
		let error = Self::ChannelClosed(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for ClusterError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for ClusterError {}
