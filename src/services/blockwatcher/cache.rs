//! Recent block cache.
//!
//! Keeps the last N delivered blocks per node. The cache answers two questions for the block
//! strategies:
//! - Where should a resumed subscription start (the newest cached block is the freshest
//!   checkpoint)
//! - Has a block already been delivered (redelivery after a resubscribe is expected and only
//!   logged)

use alloy::primitives::B256;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

use crate::models::Block;

/// Result of checking a block against the cache before it is delivered
#[derive(Debug, Clone, PartialEq)]
pub enum BlockCheckResult {
	/// Block is new and in order
	Ok,
	/// Same number and hash were already delivered
	Duplicate,
	/// Block number is below the next expected one
	OutOfOrder { expected: u64, received: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CachedBlock {
	number: u64,
	hash: B256,
}

/// Bounded per-node buffer of recently delivered blocks
#[derive(Debug)]
pub struct BlockCache {
	history: Mutex<HashMap<String, VecDeque<CachedBlock>>>,
	capacity: usize,
}

impl BlockCache {
	/// Creates a cache keeping at most `capacity` blocks per node
	pub fn new(capacity: usize) -> Self {
		Self {
			history: Mutex::new(HashMap::new()),
			capacity: capacity.max(1),
		}
	}

	/// Records a delivered block, evicting the oldest entries beyond capacity
	pub async fn record(&self, block: &Block) {
		let mut history = self.history.lock().await;
		let node_history = history
			.entry(block.node_name.clone())
			.or_insert_with(|| VecDeque::with_capacity(self.capacity));

		let entry = CachedBlock {
			number: block.number,
			hash: block.hash,
		};
		if node_history.contains(&entry) {
			return;
		}
		node_history.push_back(entry);

		while node_history.len() > self.capacity {
			node_history.pop_front();
		}
	}

	/// Highest block number delivered for the node
	pub async fn last_block(&self, node_name: &str) -> Option<u64> {
		self.history
			.lock()
			.await
			.get(node_name)
			.and_then(|history| history.iter().map(|entry| entry.number).max())
	}

	/// Whether a block with this number and hash was delivered recently
	pub async fn contains(&self, node_name: &str, number: u64, hash: B256) -> bool {
		self.history
			.lock()
			.await
			.get(node_name)
			.map(|history| history.contains(&CachedBlock { number, hash }))
			.unwrap_or(false)
	}

	/// Classifies a block about to be delivered
	pub async fn check_block(&self, block: &Block) -> BlockCheckResult {
		let history = self.history.lock().await;
		let Some(node_history) = history.get(&block.node_name) else {
			return BlockCheckResult::Ok;
		};

		let entry = CachedBlock {
			number: block.number,
			hash: block.hash,
		};
		if node_history.contains(&entry) {
			return BlockCheckResult::Duplicate;
		}

		match node_history.iter().map(|entry| entry.number).max() {
			Some(last) if block.number <= last => BlockCheckResult::OutOfOrder {
				expected: last + 1,
				received: block.number,
			},
			_ => BlockCheckResult::Ok,
		}
	}

	/// Forgets every block of a node
	pub async fn clear(&self, node_name: &str) {
		self.history.lock().await.remove(node_name);
	}
}
