//! Mock implementations shared by the integration tests.

mod clients;
mod services;

pub use clients::*;
pub use services::*;
