//! Registry error types and handling.

use log::error;
use std::{error::Error, fmt};

use crate::{
	repositories::RepositoryError,
	services::{cluster::ClusterError, filter::FilterError},
};

/// Represents possible errors while registering or removing subscriptions
#[derive(Debug)]
pub enum RegistryError {
	/// The filter or spec is not acceptable
	ValidationError(String),

	/// The spec type cannot be compiled into matching criteria
	UnsupportedCriteria(String),

	/// The persisted store rejected a change
	StoreError(String),

	/// A control message could not be published to peers
	ClusterError(String),
}

impl RegistryError {
	fn format_message(&self) -> String {
		match self {
			Self::ValidationError(msg) => format!("Validation error: {}", msg),
			Self::UnsupportedCriteria(msg) => format!("Unsupported criteria: {}", msg),
			Self::StoreError(msg) => format!("Store error: {}", msg),
			Self::ClusterError(msg) => format!("Cluster error: {}", msg),
		}
	}

	pub fn validation_error(msg: impl Into<String>) -> Self {
		let error = Self::ValidationError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn unsupported_criteria(msg: impl Into<String>) -> Self {
		let error = Self::UnsupportedCriteria(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn store_error(msg: impl Into<String>) -> Self {
		let error = Self::StoreError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn cluster_error(msg: impl Into<String>) -> Self {
		let error = Self::ClusterError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for RegistryError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for RegistryError {}

impl From<FilterError> for RegistryError {
	fn from(err: FilterError) -> Self {
		match err {
			FilterError::UnsupportedCriteria(msg) => Self::unsupported_criteria(msg),
			other => Self::validation_error(other.to_string()),
		}
	}
}

impl From<RepositoryError> for RegistryError {
	fn from(err: RepositoryError) -> Self {
		Self::store_error(err.to_string())
	}
}

impl From<ClusterError> for RegistryError {
	fn from(err: ClusterError) -> Self {
		Self::cluster_error(err.to_string())
	}
}
