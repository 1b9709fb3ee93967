use async_trait::async_trait;

use crate::models::{ContractEventDetails, ContractEventFilter, TransactionMatch};

/// Receives contract events matched by the engine
#[async_trait]
pub trait ContractEventListener: Send + Sync {
	async fn on_contract_event(&self, filter: &ContractEventFilter, event: &ContractEventDetails);
}

/// Receives transactions matched by the engine
#[async_trait]
pub trait TransactionListener: Send + Sync {
	async fn on_transaction(&self, matched: &TransactionMatch);
}
