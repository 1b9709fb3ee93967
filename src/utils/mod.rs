//! Utility modules for common functionality.
//!
//! - constants: Constants for the application
//! - http: Retrying HTTP client construction
//! - logging: Logging utilities
//! - metrics: Metrics utilities
//! - tests: Builders for test instances of models

mod constants;
mod http;

pub mod logging;
pub mod metrics;
pub mod tests;

pub use constants::*;
pub use http::{create_retryable_http_client, HttpRetryConfig};
