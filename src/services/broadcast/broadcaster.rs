//! Event broadcaster.
//!
//! Wraps blocks, contract events, matched transactions and free-form messages into
//! [`MessageEnvelope`]s and publishes them through a [`BroadcastSink`]. Each kind has its own
//! destination and partition key:
//!
//! | Kind | Key |
//! |---|---|
//! | block | envelope id |
//! | contract event | correlation id of the filter, else envelope id |
//! | transaction | block hash |
//! | message | topic |

use alloy::primitives::B256;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
	models::{
		Block, BroadcasterConfig, ContractEventDetails, ContractEventFilter, DestinationConfig,
		MessageEnvelope, MessageType, TransactionMatch,
	},
	services::{
		blockwatcher::BlockListener,
		broadcast::{BroadcastError, BroadcastSink, ChannelSink, WebhookSink},
		filter::{ContractEventListener, TransactionListener},
	},
	utils::{
		metrics::{BROADCAST_FAILURES, CONTRACT_EVENTS_BROADCAST, TRANSACTIONS_BROADCAST},
		HttpRetryConfig,
	},
};

/// Payload of a block envelope
#[derive(Debug, Serialize)]
struct NewBlockDetails<'a> {
	number: u64,
	hash: B256,
	parent_hash: B256,
	timestamp: u64,
	node_name: &'a str,
	transactions: Vec<B256>,
}

impl<'a> From<&'a Block> for NewBlockDetails<'a> {
	fn from(block: &'a Block) -> Self {
		Self {
			number: block.number,
			hash: block.hash,
			parent_hash: block.parent_hash,
			timestamp: block.timestamp,
			node_name: &block.node_name,
			transactions: block.transactions.iter().map(|tx| tx.hash).collect(),
		}
	}
}

fn type_label(type_: MessageType) -> &'static str {
	match type_ {
		MessageType::Block => "block",
		MessageType::ContractEvent => "contract_event",
		MessageType::Transaction => "transaction",
		MessageType::Message => "message",
	}
}

/// Publishes relay output to downstream consumers
pub struct EventBroadcaster {
	sink: Arc<dyn BroadcastSink>,
	destinations: DestinationConfig,
}

impl EventBroadcaster {
	pub fn new(sink: Arc<dyn BroadcastSink>, destinations: DestinationConfig) -> Self {
		Self { sink, destinations }
	}

	/// Builds a broadcaster from configuration.
	///
	/// # Returns
	/// * `Result<(Self, Option<Arc<ChannelSink>>), BroadcastError>` - The broadcaster, plus
	///   the channel sink when one was configured so callers can subscribe to it
	pub fn from_config(
		config: &BroadcasterConfig,
		destinations: DestinationConfig,
	) -> Result<(Self, Option<Arc<ChannelSink>>), BroadcastError> {
		match config {
			BroadcasterConfig::Channel { capacity } => {
				let sink = Arc::new(ChannelSink::new(*capacity));
				Ok((Self::new(sink.clone(), destinations), Some(sink)))
			}
			BroadcasterConfig::Webhook { url, secret } => {
				let sink = WebhookSink::new(url, secret.clone(), &HttpRetryConfig::default())?;
				Ok((Self::new(Arc::new(sink), destinations), None))
			}
		}
	}

	pub fn destinations(&self) -> &DestinationConfig {
		&self.destinations
	}

	async fn publish(
		&self,
		destination: &str,
		key: Option<String>,
		envelope: MessageEnvelope,
	) -> Result<MessageEnvelope, BroadcastError> {
		let key = key.unwrap_or_else(|| envelope.id.clone());
		match self.sink.publish(destination, &key, &envelope).await {
			Ok(()) => {
				debug!(
					destination = %destination,
					key = %key,
					envelope_id = %envelope.id,
					"Envelope published"
				);
				Ok(envelope)
			}
			Err(e) => {
				BROADCAST_FAILURES
					.with_label_values(&[type_label(envelope.type_)])
					.inc();
				Err(BroadcastError::network_error(format!(
					"Failed to publish {} envelope {} to '{}': {}",
					type_label(envelope.type_),
					envelope.id,
					destination,
					e
				)))
			}
		}
	}

	/// Publishes a newly observed block, keyed by the envelope id
	#[instrument(skip_all, fields(node = %block.node_name, block = block.number))]
	pub async fn broadcast_new_block(&self, block: &Block) -> Result<MessageEnvelope, BroadcastError> {
		let details = serde_json::to_value(NewBlockDetails::from(block))?;
		let envelope = MessageEnvelope::new(MessageType::Block, details);
		self.publish(&self.destinations.block, None, envelope).await
	}

	/// Publishes a matched contract event.
	///
	/// The key is the filter's correlation id for the event, falling back to the envelope id
	/// when the filter has no strategy or the event lacks the parameter.
	#[instrument(skip_all, fields(filter = %filter.id, event = %event.id))]
	pub async fn broadcast_contract_event(
		&self,
		filter: &ContractEventFilter,
		event: &ContractEventDetails,
	) -> Result<MessageEnvelope, BroadcastError> {
		let details = serde_json::to_value(event)?;
		let envelope = MessageEnvelope::new(MessageType::ContractEvent, details);
		let key = filter
			.correlation_id_strategy
			.as_ref()
			.and_then(|strategy| strategy.correlation_id(&event.to_log()));

		let envelope = self
			.publish(&self.destinations.contract_event, key, envelope)
			.await?;
		CONTRACT_EVENTS_BROADCAST
			.with_label_values(&[event.node_name.as_str()])
			.inc();
		Ok(envelope)
	}

	/// Publishes a matched transaction, keyed by its block hash
	#[instrument(skip_all, fields(spec = %matched.spec_id, tx = %matched.transaction.hash))]
	pub async fn broadcast_transaction(
		&self,
		matched: &TransactionMatch,
	) -> Result<MessageEnvelope, BroadcastError> {
		let details = serde_json::to_value(matched)?;
		let envelope = MessageEnvelope::new(MessageType::Transaction, details);
		let key = matched.transaction.block_hash.to_string();

		let envelope = self
			.publish(&self.destinations.transaction, Some(key), envelope)
			.await?;
		TRANSACTIONS_BROADCAST
			.with_label_values(&[matched.node_name.as_str()])
			.inc();
		Ok(envelope)
	}

	/// Publishes a free-form message, keyed by its topic
	pub async fn broadcast_message(
		&self,
		topic: &str,
		details: serde_json::Value,
	) -> Result<MessageEnvelope, BroadcastError> {
		let envelope = MessageEnvelope::new(MessageType::Message, details);
		self.publish(&self.destinations.message, Some(topic.to_string()), envelope)
			.await
	}
}

// Listener adapters. Failures were already logged and counted by `publish`.

#[async_trait]
impl BlockListener for EventBroadcaster {
	async fn on_block(&self, block: Arc<Block>) {
		let _ = self.broadcast_new_block(&block).await;
	}
}

#[async_trait]
impl ContractEventListener for EventBroadcaster {
	async fn on_contract_event(&self, filter: &ContractEventFilter, event: &ContractEventDetails) {
		let _ = self.broadcast_contract_event(filter, event).await;
	}
}

#[async_trait]
impl TransactionListener for EventBroadcaster {
	async fn on_transaction(&self, matched: &TransactionMatch) {
		let _ = self.broadcast_transaction(matched).await;
	}
}
