//! Ledger data as observed on a node.
//!
//! Blocks, transactions and logs are immutable once observed. Both NORMAL and MIRROR nodes
//! report the same account-based shape, so a single set of types covers every node.

mod block;
mod event;
mod transaction;

pub use block::Block;
pub use event::{ContractEventDetails, ContractEventStatus, ContractLog, LogQuery};
pub use transaction::{Transaction, TransactionMatch, TransactionReceipt, TransactionStatus};
