//! Matching engine.
//!
//! For every block of a node the engine runs two independent passes on the node's dispatch
//! queue:
//!
//! - the contract event pass probes the block bloom for every filter of the node and fetches
//!   logs only for filters whose probe is positive
//! - the transaction pass evaluates the node's criteria against every transaction in
//!   registration order; the first matching criteria wins, and one-time criteria are claimed
//!   from the registry before their match is reported

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
	models::{Block, ContractEventDetails, LogQuery, Transaction, TransactionMatch},
	services::{
		blockchain::NodeClient,
		blockwatcher::BlockListener,
		dispatch::DispatchQueues,
		filter::{
			bloom_may_contain, ContractEventListener, TransactionListener,
			TransactionMatchingCriteria, TransactionPassExtension,
		},
		registry::SubscriptionRegistry,
	},
};

/// Matches the blocks of one node against the registry
pub struct MatchingEngine {
	node_name: String,
	client: Arc<dyn NodeClient>,
	registry: Arc<SubscriptionRegistry>,
	extension: Option<Arc<dyn TransactionPassExtension>>,
	event_listeners: Vec<Arc<dyn ContractEventListener>>,
	transaction_listeners: Vec<Arc<dyn TransactionListener>>,
}

impl MatchingEngine {
	/// Creates an engine for the node the client is bound to
	pub fn new(client: Arc<dyn NodeClient>, registry: Arc<SubscriptionRegistry>) -> Self {
		Self {
			node_name: client.node_name().to_string(),
			client,
			registry,
			extension: None,
			event_listeners: Vec::new(),
			transaction_listeners: Vec::new(),
		}
	}

	/// Runs `extension` on every transaction before criteria are evaluated
	pub fn with_extension(mut self, extension: Arc<dyn TransactionPassExtension>) -> Self {
		self.extension = Some(extension);
		self
	}

	pub fn with_contract_event_listener(
		mut self,
		listener: Arc<dyn ContractEventListener>,
	) -> Self {
		self.event_listeners.push(listener);
		self
	}

	pub fn with_transaction_listener(mut self, listener: Arc<dyn TransactionListener>) -> Self {
		self.transaction_listeners.push(listener);
		self
	}

	pub fn node_name(&self) -> &str {
		&self.node_name
	}

	/// Block listener scheduling both passes on the node's dispatch queue
	pub fn into_block_listener(
		self: Arc<Self>,
		queues: Arc<DispatchQueues>,
	) -> Arc<dyn BlockListener> {
		Arc::new(MatchingBlockListener {
			engine: self,
			queues,
		})
	}

	/// Matches the node's contract event filters against a block.
	///
	/// # Returns
	/// * `Vec<ContractEventDetails>` - Every event handed to the listeners, in filter order
	pub async fn contract_event_pass(&self, block: &Block) -> Vec<ContractEventDetails> {
		let mut matched = Vec::new();

		for filter in self.registry.filters_for_node(&self.node_name).await {
			if filter.start_block.is_some_and(|start| block.number < start) {
				continue;
			}
			if !bloom_may_contain(&block.logs_bloom, &filter) {
				continue;
			}

			let logs = match self
				.client
				.get_logs(&LogQuery::for_block(&filter, block.number))
				.await
			{
				Ok(logs) => logs,
				Err(e) => {
					warn!(
						node = %self.node_name,
						filter_id = %filter.id,
						block = block.number,
						error = %e,
						"Failed to fetch logs, skipping filter for this block"
					);
					continue;
				}
			};

			let topic = filter.event_topic();
			for log in logs.iter().filter(|log| {
				log.topics.first() == Some(&topic)
					&& filter
						.contract_address
						.is_none_or(|address| address == log.address)
			}) {
				let event = ContractEventDetails::from_log(&filter, block, log);
				for listener in &self.event_listeners {
					listener.on_contract_event(&filter, &event).await;
				}
				matched.push(event);
			}
		}

		if !matched.is_empty() {
			debug!(
				node = %self.node_name,
				block = block.number,
				events = matched.len(),
				"Matched contract events"
			);
		}
		matched
	}

	/// Matches the node's transaction criteria against a block.
	///
	/// # Returns
	/// * `Vec<TransactionMatch>` - At most one match per transaction
	pub async fn transaction_pass(&self, block: &Block) -> Vec<TransactionMatch> {
		let criteria = self.registry.monitors_for_node(&self.node_name).await;
		if criteria.is_empty() {
			return Vec::new();
		}

		let mut matched = Vec::new();
		for transaction in &block.transactions {
			let transaction = self.prepare(transaction.clone()).await;
			let Some(spec_id) = self.first_match(&criteria, &transaction).await else {
				continue;
			};

			let transaction_match = TransactionMatch {
				spec_id,
				node_name: self.node_name.clone(),
				transaction,
				timestamp: block.timestamp,
			};
			for listener in &self.transaction_listeners {
				listener.on_transaction(&transaction_match).await;
			}
			matched.push(transaction_match);
		}

		if !matched.is_empty() {
			debug!(
				node = %self.node_name,
				block = block.number,
				transactions = matched.len(),
				"Matched transactions"
			);
		}
		matched
	}

	async fn prepare(&self, transaction: Transaction) -> Transaction {
		let Some(extension) = &self.extension else {
			return transaction;
		};
		let hash = transaction.hash;
		match extension.prepare(self.client.as_ref(), transaction.clone()).await {
			Ok(prepared) => prepared,
			Err(e) => {
				warn!(
					node = %self.node_name,
					transaction = %hash,
					error = %e,
					"Transaction pass extension failed, matching the transaction as observed"
				);
				transaction
			}
		}
	}

	async fn first_match(
		&self,
		criteria: &[TransactionMatchingCriteria],
		transaction: &Transaction,
	) -> Option<String> {
		for candidate in criteria.iter().filter(|c| c.matches(transaction)) {
			if candidate.is_one_time_match()
				&& !self.registry.claim_one_time_monitor(&candidate.spec_id).await
			{
				debug!(
					spec_id = %candidate.spec_id,
					transaction = %transaction.hash,
					"One-time monitor already claimed"
				);
				continue;
			}
			return Some(candidate.spec_id.clone());
		}
		None
	}
}

struct MatchingBlockListener {
	engine: Arc<MatchingEngine>,
	queues: Arc<DispatchQueues>,
}

#[async_trait]
impl BlockListener for MatchingBlockListener {
	async fn on_block(&self, block: Arc<Block>) {
		let node_name = self.engine.node_name.clone();

		let engine = self.engine.clone();
		let events_block = block.clone();
		let events = Box::pin(async move {
			engine.contract_event_pass(&events_block).await;
		});
		if let Err(e) = self
			.queues
			.enqueue(&node_name, block.number, "contract event pass", events)
			.await
		{
			warn!(node = %node_name, block = block.number, error = %e, "Block not matched");
			return;
		}

		let engine = self.engine.clone();
		let transactions_block = block.clone();
		let transactions = Box::pin(async move {
			engine.transaction_pass(&transactions_block).await;
		});
		if let Err(e) = self
			.queues
			.enqueue(&node_name, block.number, "transaction pass", transactions)
			.await
		{
			warn!(node = %node_name, block = block.number, error = %e, "Block not matched");
		}
	}
}
