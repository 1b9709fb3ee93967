//! Cluster bus interface and the in-process implementation.
//!
//! Every subscriber receives every published envelope, including the publisher's own
//! instance. Consumers filter their own messages by origin.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;
use tracing::error;

use crate::{
	models::ClusterEnvelope, services::cluster::ClusterError,
	utils::metrics::CLUSTER_MESSAGES_DROPPED,
};

/// Stream of envelopes delivered to one subscriber
pub type ClusterSubscription = BoxStream<'static, ClusterEnvelope>;

/// Publish/subscribe channel for registry control messages
#[async_trait]
pub trait ClusterBus: Send + Sync {
	/// Hands an envelope to the bus
	async fn publish(&self, envelope: ClusterEnvelope) -> Result<(), ClusterError>;

	/// Opens a subscription receiving every envelope published from now on
	async fn subscribe(&self) -> Result<ClusterSubscription, ClusterError>;
}

/// Cluster bus backed by a tokio broadcast channel.
///
/// Relay instances sharing one `Arc<InMemoryClusterBus>` behave like peers on a real broker.
pub struct InMemoryClusterBus {
	sender: broadcast::Sender<ClusterEnvelope>,
}

impl InMemoryClusterBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	/// Number of open subscriptions
	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}

impl Default for InMemoryClusterBus {
	fn default() -> Self {
		Self::new(1024)
	}
}

#[async_trait]
impl ClusterBus for InMemoryClusterBus {
	async fn publish(&self, envelope: ClusterEnvelope) -> Result<(), ClusterError> {
		// No subscriber means no peer is listening, which is not a failure.
		let _ = self.sender.send(envelope);
		Ok(())
	}

	async fn subscribe(&self) -> Result<ClusterSubscription, ClusterError> {
		let receiver = self.sender.subscribe();
		let subscription = stream::unfold(receiver, |mut receiver| async move {
			loop {
				match receiver.recv().await {
					Ok(envelope) => return Some((envelope, receiver)),
					Err(broadcast::error::RecvError::Lagged(skipped)) => {
						error!(skipped, "Dropping cluster messages lost to a lagging subscriber");
						CLUSTER_MESSAGES_DROPPED.inc_by(skipped);
					}
					Err(broadcast::error::RecvError::Closed) => return None,
				}
			}
		});
		Ok(subscription.boxed())
	}
}
