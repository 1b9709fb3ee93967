//! Transaction pass extensions.
//!
//! An extension runs once per transaction before criteria are evaluated, and may enrich the
//! transaction with data the block itself does not carry. It never sees contract event
//! filters and cannot change the order in which transactions are evaluated.

use async_trait::async_trait;

use crate::{
	models::Transaction,
	services::{blockchain::NodeClient, filter::FilterError},
};

/// Hook specializing the transaction pass for a ledger dialect
#[async_trait]
pub trait TransactionPassExtension: Send + Sync {
	/// Returns the transaction as criteria should see it
	async fn prepare(
		&self,
		client: &dyn NodeClient,
		transaction: Transaction,
	) -> Result<Transaction, FilterError>;
}

/// Fills status and logs from the transaction receipt.
///
/// Transactions without a receipt yet keep their status.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReceiptStatusExtension;

#[async_trait]
impl TransactionPassExtension for ReceiptStatusExtension {
	async fn prepare(
		&self,
		client: &dyn NodeClient,
		mut transaction: Transaction,
	) -> Result<Transaction, FilterError> {
		if let Some(receipt) = client.get_transaction_receipt(transaction.hash).await? {
			transaction.status = receipt.status();
			if transaction.logs.is_empty() {
				transaction.logs = receipt.logs;
			}
		}
		Ok(transaction)
	}
}
