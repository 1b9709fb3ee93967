//! Configuration error types.
//!
//! Parse and file errors keep the path of the offending file so a bad entry in
//! `config/` can be located from the log line alone.

use log::error;
use std::{
	error::Error,
	fmt,
	path::{Path, PathBuf},
};

/// Errors that can occur while loading relay, node, filter or monitor configuration
#[derive(Debug)]
pub enum ConfigError {
	/// A loaded entity failed validation
	ValidationError(String),

	/// A file is not valid JSON for the expected entity
	ParseError { path: PathBuf, message: String },

	/// A file or directory cannot be read
	FileError { path: PathBuf, message: String },
}

impl ConfigError {
	fn format_message(&self) -> String {
		match self {
			Self::ValidationError(msg) => format!("Validation error: {}", msg),
			Self::ParseError { path, message } => {
				format!("Parse error in {}: {}", path.display(), message)
			}
			Self::FileError { path, message } => {
				format!("File error at {}: {}", path.display(), message)
			}
		}
	}

	/// Create a new validation error and log it
	pub fn validation_error(msg: impl Into<String>) -> Self {
		let error = Self::ValidationError(msg.into());
		error!("{}", error.format_message());
		error
	}

	/// Create a new parse error for `path` and log it
	pub fn parse_error(path: &Path, msg: impl fmt::Display) -> Self {
		let error = Self::ParseError {
			path: path.to_path_buf(),
			message: msg.to_string(),
		};
		error!("{}", error.format_message());
		error
	}

	/// Create a new file error for `path` and log it
	pub fn file_error(path: &Path, msg: impl fmt::Display) -> Self {
		let error = Self::FileError {
			path: path.to_path_buf(),
			message: msg.to_string(),
		};
		error!("{}", error.format_message());
		error
	}

	/// Path of the file the error refers to, if any
	pub fn path(&self) -> Option<&Path> {
		match self {
			Self::ValidationError(_) => None,
			Self::ParseError { path, .. } | Self::FileError { path, .. } => Some(path),
		}
	}
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for ConfigError {}
