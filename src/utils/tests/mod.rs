//! Test helper utilities
//!
//! This module contains test helper utilities for the application.
//!
//! - `builders`: Test helper utilities for creating test instances of models

pub mod builders {
	pub mod block;
	pub mod filter;
	pub mod log;
	pub mod monitor;
	pub mod node;
	pub mod transaction;
}

pub use builders::*;
