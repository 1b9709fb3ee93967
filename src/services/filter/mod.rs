//! Matching of blocks against registered filters and monitoring specs.
//!
//! - `bloom`: cheap membership probe deciding whether logs are fetched
//! - `criteria`: transaction criteria compiled from monitoring specs
//! - `extension`: per-dialect hook run before transaction criteria
//! - `engine`: the contract event and transaction passes

mod bloom;
mod criteria;
mod engine;
mod error;
mod extension;
mod listener;

pub use bloom::bloom_may_contain;
pub use criteria::{CriteriaKind, TransactionMatchingCriteria};
pub use engine::MatchingEngine;
pub use error::FilterError;
pub use extension::{ReceiptStatusExtension, TransactionPassExtension};
pub use listener::{ContractEventListener, TransactionListener};
