//! Node client interface.
//!
//! Every ledger binding the relay talks to implements [`NodeClient`]. The relay only relies
//! on the behavior described here, never on a particular RPC dialect.

use alloy::primitives::B256;
use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{
	models::{Block, ContractLog, LogQuery, TransactionReceipt},
	services::blockchain::BlockChainError,
};

/// Stream of blocks pushed by a node
pub type BlockStream = BoxStream<'static, Result<Block, BlockChainError>>;

/// Defines the interface the relay uses to read from a ledger node
#[async_trait]
pub trait NodeClient: Send + Sync {
	/// Name of the node this client is bound to
	fn node_name(&self) -> &str;

	/// Whether [`NodeClient::subscribe_new_blocks`] is available
	fn supports_push(&self) -> bool {
		false
	}

	/// Retrieves the latest block number known to the node
	async fn get_latest_block_number(&self) -> Result<u64, BlockChainError>;

	/// Retrieves a block with its transactions
	///
	/// # Returns
	/// * `Ok(None)` - The block is not available yet
	async fn get_block_by_number(&self, number: u64) -> Result<Option<Block>, BlockChainError>;

	/// Opens a stream of blocks pushed by the node as they are produced
	async fn subscribe_new_blocks(&self) -> Result<BlockStream, BlockChainError> {
		Err(BlockChainError::unsupported(format!(
			"node '{}' does not push new blocks",
			self.node_name()
		)))
	}

	/// Retrieves logs matching the query
	async fn get_logs(&self, query: &LogQuery) -> Result<Vec<ContractLog>, BlockChainError>;

	/// Retrieves a transaction receipt, `None` while it is not available
	async fn get_transaction_receipt(
		&self,
		transaction_hash: B256,
	) -> Result<Option<TransactionReceipt>, BlockChainError>;

	/// Whether the node reports that it is still catching up with the chain
	async fn is_syncing(&self) -> Result<bool, BlockChainError>;

	/// Whether the node transport currently answers
	async fn is_connected(&self) -> bool;

	/// Re-establishes the transport
	async fn reconnect(&self) -> Result<(), BlockChainError>;
}
