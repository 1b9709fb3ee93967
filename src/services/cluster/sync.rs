//! Cluster synchronization.
//!
//! The publisher wraps registry changes in envelopes and hands them to the bus with bounded
//! retries. The consumer applies messages published by peer instances to a local handler,
//! retrying each one with backoff and dropping it once the attempts are exhausted.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use futures::StreamExt;
use std::{sync::Arc, time::Duration};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

use crate::{
	models::{ClusterConfig, ClusterControlMessage, ClusterEnvelope},
	services::cluster::{ClusterBus, ClusterError},
	utils::metrics::CLUSTER_MESSAGES_DROPPED,
};

/// Applies control messages received from peer instances
#[async_trait]
pub trait ClusterMessageHandler: Send + Sync {
	/// Applies one message; must be idempotent because delivery is at-least-once
	async fn handle(&self, message: ClusterControlMessage) -> Result<(), ClusterError>;
}

fn retry_backoff(config: &ClusterConfig) -> ExponentialBuilder {
	ExponentialBuilder::default()
		.with_min_delay(config.initial_backoff())
		.with_max_delay(config.max_backoff().max(config.initial_backoff()))
		.with_factor(2.0)
		.with_max_times(config.retry_attempts)
}

/// Publishes control messages on behalf of one instance
#[derive(Clone)]
pub struct ClusterPublisher {
	bus: Arc<dyn ClusterBus>,
	instance_id: String,
	config: ClusterConfig,
}

impl ClusterPublisher {
	pub fn new(
		bus: Arc<dyn ClusterBus>,
		instance_id: impl Into<String>,
		config: ClusterConfig,
	) -> Self {
		Self {
			bus,
			instance_id: instance_id.into(),
			config,
		}
	}

	pub fn instance_id(&self) -> &str {
		&self.instance_id
	}

	/// Publishes a message, retrying up to `retry_attempts` times after the first failure.
	///
	/// # Returns
	/// * `Result<ClusterEnvelope, ClusterError>` - The published envelope, or the last error
	pub async fn publish(
		&self,
		message: ClusterControlMessage,
	) -> Result<ClusterEnvelope, ClusterError> {
		let envelope =
			ClusterEnvelope::new(&self.instance_id, message, self.config.partition_count);

		(|| async { self.bus.publish(envelope.clone()).await })
			.retry(retry_backoff(&self.config))
			.sleep(tokio::time::sleep)
			.notify(|err: &ClusterError, delay: Duration| {
				warn!(
					message_id = %envelope.id,
					error = %err,
					"Retrying cluster publish in {:?}", delay
				);
			})
			.await?;

		debug!(
			message_id = %envelope.id,
			kind = envelope.message.kind(),
			partition = envelope.partition,
			"Published cluster message"
		);
		Ok(envelope)
	}
}

/// Applies peer messages from the bus to a local handler
pub struct ClusterConsumer {
	instance_id: String,
	handler: Arc<dyn ClusterMessageHandler>,
	config: ClusterConfig,
}

impl ClusterConsumer {
	pub fn new(
		instance_id: impl Into<String>,
		handler: Arc<dyn ClusterMessageHandler>,
		config: ClusterConfig,
	) -> Self {
		Self {
			instance_id: instance_id.into(),
			handler,
			config,
		}
	}

	/// Applies one envelope.
	///
	/// # Returns
	/// * `bool` - Whether the message was applied; messages from this instance count as
	///   applied, exhausted messages are dropped and counted
	pub async fn process(&self, envelope: ClusterEnvelope) -> bool {
		if envelope.origin == self.instance_id {
			debug!(message_id = %envelope.id, "Skipping own cluster message");
			return true;
		}

		let result = (|| async { self.handler.handle(envelope.message.clone()).await })
			.retry(retry_backoff(&self.config))
			.sleep(tokio::time::sleep)
			.notify(|err: &ClusterError, delay: Duration| {
				warn!(
					message_id = %envelope.id,
					error = %err,
					"Retrying cluster message in {:?}", delay
				);
			})
			.await;

		match result {
			Ok(()) => {
				debug!(
					message_id = %envelope.id,
					origin = %envelope.origin,
					kind = envelope.message.kind(),
					"Applied cluster message"
				);
				true
			}
			Err(e) => {
				error!(
					message_id = %envelope.id,
					origin = %envelope.origin,
					kind = envelope.message.kind(),
					error = %e,
					"Dropping cluster message after exhausting retries"
				);
				CLUSTER_MESSAGES_DROPPED.inc();
				false
			}
		}
	}

	/// Subscribes to the bus and processes messages until shutdown.
	///
	/// The subscription is open when this returns, so messages published afterwards are
	/// never missed.
	pub async fn spawn(
		self,
		bus: Arc<dyn ClusterBus>,
		mut shutdown: watch::Receiver<bool>,
	) -> Result<JoinHandle<()>, ClusterError> {
		let mut subscription = bus.subscribe().await?;

		Ok(tokio::spawn(async move {
			info!(instance = %self.instance_id, "Cluster consumer started");
			loop {
				let envelope = tokio::select! {
					biased;
					_ = shutdown.wait_for(|stop| *stop) => break,
					envelope = subscription.next() => envelope,
				};

				match envelope {
					Some(envelope) => {
						self.process(envelope).await;
					}
					None => {
						warn!(instance = %self.instance_id, "Cluster bus closed");
						break;
					}
				}
			}
			info!(instance = %self.instance_id, "Cluster consumer stopped");
		}))
	}
}
