//! Mock implementations of node clients.
//!
//! - [`MockNodeClient`] - mockall mock for asserting exact calls
//! - [`ScriptedChain`] - stateful fake serving a chain the test extends block by block

use alloy::primitives::B256;
use async_trait::async_trait;
use mockall::mock;
use std::{
	collections::{BTreeMap, HashMap},
	sync::{
		atomic::{AtomicBool, AtomicUsize, Ordering},
		Mutex,
	},
};

use chain_event_relay::{
	models::{Block, ContractLog, LogQuery, TransactionReceipt},
	services::blockchain::{BlockChainError, NodeClient},
};

mock! {
	/// Mock implementation of the node client trait.
	///
	/// Push delivery is left to the trait default, so the mock always polls.
	pub NodeClient {}

	#[async_trait]
	impl NodeClient for NodeClient {
		fn node_name(&self) -> &str;
		async fn get_latest_block_number(&self) -> Result<u64, BlockChainError>;
		async fn get_block_by_number(&self, number: u64) -> Result<Option<Block>, BlockChainError>;
		async fn get_logs(&self, query: &LogQuery) -> Result<Vec<ContractLog>, BlockChainError>;
		async fn get_transaction_receipt(
			&self,
			transaction_hash: B256,
		) -> Result<Option<TransactionReceipt>, BlockChainError>;
		async fn is_syncing(&self) -> Result<bool, BlockChainError>;
		async fn is_connected(&self) -> bool;
		async fn reconnect(&self) -> Result<(), BlockChainError>;
	}
}

/// Polling node fake whose chain, receipts and liveness are driven by the test
pub struct ScriptedChain {
	name: String,
	blocks: Mutex<BTreeMap<u64, Block>>,
	logs: Mutex<Vec<ContractLog>>,
	receipts: Mutex<HashMap<B256, TransactionReceipt>>,
	connected: AtomicBool,
	requested: Mutex<Vec<u64>>,
	log_queries: AtomicUsize,
	reconnects: AtomicUsize,
}

impl ScriptedChain {
	pub fn new(name: &str) -> Self {
		Self {
			name: name.to_string(),
			blocks: Mutex::new(BTreeMap::new()),
			logs: Mutex::new(Vec::new()),
			receipts: Mutex::new(HashMap::new()),
			connected: AtomicBool::new(true),
			requested: Mutex::new(Vec::new()),
			log_queries: AtomicUsize::new(0),
			reconnects: AtomicUsize::new(0),
		}
	}

	/// Appends a block; the head moves to the highest block pushed
	pub fn push_block(&self, block: Block) {
		self.blocks.lock().unwrap().insert(block.number, block);
	}

	/// Makes a log visible to `get_logs`
	pub fn add_log(&self, log: ContractLog) {
		self.logs.lock().unwrap().push(log);
	}

	pub fn add_receipt(&self, receipt: TransactionReceipt) {
		self.receipts
			.lock()
			.unwrap()
			.insert(receipt.transaction_hash, receipt);
	}

	/// Every call fails with a transport error until [`ScriptedChain::reconnect`] runs
	pub fn disconnect(&self) {
		self.connected.store(false, Ordering::SeqCst);
	}

	/// Block numbers requested so far, in request order
	pub fn requested_blocks(&self) -> Vec<u64> {
		self.requested.lock().unwrap().clone()
	}

	pub fn log_queries(&self) -> usize {
		self.log_queries.load(Ordering::SeqCst)
	}

	pub fn reconnects(&self) -> usize {
		self.reconnects.load(Ordering::SeqCst)
	}

	fn ensure_connected(&self) -> Result<(), BlockChainError> {
		if self.connected.load(Ordering::SeqCst) {
			Ok(())
		} else {
			Err(BlockChainError::connection_error("node offline"))
		}
	}
}

#[async_trait]
impl NodeClient for ScriptedChain {
	fn node_name(&self) -> &str {
		&self.name
	}

	async fn get_latest_block_number(&self) -> Result<u64, BlockChainError> {
		self.ensure_connected()?;
		Ok(self
			.blocks
			.lock()
			.unwrap()
			.keys()
			.next_back()
			.copied()
			.unwrap_or(0))
	}

	async fn get_block_by_number(&self, number: u64) -> Result<Option<Block>, BlockChainError> {
		self.ensure_connected()?;
		self.requested.lock().unwrap().push(number);
		Ok(self.blocks.lock().unwrap().get(&number).cloned())
	}

	async fn get_logs(&self, query: &LogQuery) -> Result<Vec<ContractLog>, BlockChainError> {
		self.ensure_connected()?;
		self.log_queries.fetch_add(1, Ordering::SeqCst);
		Ok(self
			.logs
			.lock()
			.unwrap()
			.iter()
			.filter(|log| {
				log.block_number >= query.from_block
					&& log.block_number <= query.to_block
					&& query.address.is_none_or(|address| address == log.address)
					&& query
						.topics
						.first()
						.is_none_or(|topic| log.topics.first() == Some(topic))
			})
			.cloned()
			.collect())
	}

	async fn get_transaction_receipt(
		&self,
		transaction_hash: B256,
	) -> Result<Option<TransactionReceipt>, BlockChainError> {
		self.ensure_connected()?;
		Ok(self.receipts.lock().unwrap().get(&transaction_hash).cloned())
	}

	async fn is_syncing(&self) -> Result<bool, BlockChainError> {
		self.ensure_connected()?;
		Ok(false)
	}

	async fn is_connected(&self) -> bool {
		self.connected.load(Ordering::SeqCst)
	}

	async fn reconnect(&self) -> Result<(), BlockChainError> {
		self.reconnects.fetch_add(1, Ordering::SeqCst);
		self.connected.store(true, Ordering::SeqCst);
		Ok(())
	}
}
