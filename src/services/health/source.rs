//! What the health supervisor observes and restarts.

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tracing::debug;

use crate::services::{
	blockchain::{BlockChainError, NodeClient},
	blockwatcher::{BlockSubscriptionStrategy, ErrorCallback},
	health::HealthError,
};

/// A node's block stream as seen by the health supervisor
#[async_trait]
pub trait BlockSource: Send + Sync {
	fn node_name(&self) -> &str;

	/// Whether the node transport answers
	async fn is_connected(&self) -> bool;

	/// Whether a subscription is currently delivering blocks
	async fn is_subscribed(&self) -> bool;

	/// Whether the node reports it is still syncing
	async fn is_syncing(&self) -> Result<bool, BlockChainError>;

	/// Time since the last delivered block, or since the subscription started
	async fn last_block_age(&self) -> Duration;

	/// Re-establishes the node transport
	async fn reconnect_transport(&self) -> Result<(), HealthError>;

	/// Restarts the block stream from its checkpoint, returning the start block
	async fn resubscribe(&self) -> Result<u64, HealthError>;

	/// Stops the block stream
	async fn unsubscribe(&self);

	/// Registers the callback told when the stream ends with an error
	async fn on_error(&self, callback: ErrorCallback);
}

/// [`BlockSource`] backed by a block subscription strategy and the node's client
pub struct StrategyBlockSource {
	strategy: Arc<dyn BlockSubscriptionStrategy>,
	client: Arc<dyn NodeClient>,
}

impl StrategyBlockSource {
	pub fn new(strategy: Arc<dyn BlockSubscriptionStrategy>, client: Arc<dyn NodeClient>) -> Self {
		Self { strategy, client }
	}
}

#[async_trait]
impl BlockSource for StrategyBlockSource {
	fn node_name(&self) -> &str {
		&self.strategy.node().name
	}

	async fn is_connected(&self) -> bool {
		self.client.is_connected().await
	}

	async fn is_subscribed(&self) -> bool {
		self.strategy.is_subscribed().await
	}

	async fn is_syncing(&self) -> Result<bool, BlockChainError> {
		self.client.is_syncing().await
	}

	async fn last_block_age(&self) -> Duration {
		self.strategy.last_block_age().await
	}

	async fn reconnect_transport(&self) -> Result<(), HealthError> {
		self.client.reconnect().await.map_err(HealthError::from)
	}

	/// Unsubscribes, re-registers every listener exactly once, then subscribes again
	async fn resubscribe(&self) -> Result<u64, HealthError> {
		self.strategy.unsubscribe().await;

		let listeners = self.strategy.block_listeners().await;
		for (id, _) in listeners.iter() {
			self.strategy.remove_block_listener(*id).await;
		}
		for (_, listener) in listeners {
			self.strategy.add_block_listener(listener).await;
		}
		debug!(node = %self.node_name(), "Listeners re-registered");

		let handle = self.strategy.subscribe().await?;
		Ok(handle.start_block())
	}

	async fn unsubscribe(&self) {
		self.strategy.unsubscribe().await;
	}

	async fn on_error(&self, callback: ErrorCallback) {
		self.strategy.set_error_callback(callback).await;
	}
}
