//! Health supervisor state machine.
//!
//! One supervisor per node probes its [`BlockSource`] on the node's health check interval:
//! - disconnected, unsubscribed or stale beyond the syncing threshold: FAILED, then a
//!   reconnect round
//! - fresh but the node reports syncing: SYNCING
//! - otherwise ACTIVE
//!
//! A reconnect round is RECONNECTING, then for each delay of the [`ReconnectPolicy`]: wait,
//! re-establish the transport and resubscribe. Success returns to ACTIVE; an exhausted round
//! leaves the node FAILED until the next probe starts a new round. Rounds run on the probe
//! task, so they are never restarted while in progress; stream errors only wake the probe.

use std::{
	sync::{
		atomic::{AtomicBool, Ordering},
		Arc,
	},
	time::Duration,
};
use tokio::{
	sync::{broadcast, watch, Notify},
	task::JoinHandle,
};
use tracing::{info, warn};

use crate::{
	models::{Node, NodeHealthState},
	services::{
		blockwatcher::BlockWatcherError,
		health::{BlockSource, HealthError, ReconnectPolicy},
	},
	utils::metrics::{record_node_health, RECONNECT_ATTEMPTS},
};

/// A change of a node's health state
#[derive(Debug, Clone, PartialEq)]
pub struct HealthTransition {
	pub node_name: String,
	pub from: NodeHealthState,
	pub to: NodeHealthState,
}

/// Supervises the block stream of one node
pub struct HealthSupervisor {
	node_name: String,
	probe_interval: Duration,
	syncing_threshold: Duration,
	source: Arc<dyn BlockSource>,
	policy: Arc<dyn ReconnectPolicy>,
	state: watch::Sender<NodeHealthState>,
	transitions: broadcast::Sender<HealthTransition>,
	wake: Arc<Notify>,
	reconnecting: AtomicBool,
}

impl HealthSupervisor {
	/// Creates a supervisor using the node's probe interval and syncing threshold
	pub fn new(
		node: &Node,
		source: Arc<dyn BlockSource>,
		policy: Arc<dyn ReconnectPolicy>,
	) -> Self {
		let (state, _) = watch::channel(NodeHealthState::Active);
		let (transitions, _) = broadcast::channel(64);
		record_node_health(&node.name, NodeHealthState::Active);
		Self {
			node_name: node.name.clone(),
			probe_interval: node.health_check_interval(),
			syncing_threshold: node.syncing_threshold(),
			source,
			policy,
			state,
			transitions,
			wake: Arc::new(Notify::new()),
			reconnecting: AtomicBool::new(false),
		}
	}

	pub fn node_name(&self) -> &str {
		&self.node_name
	}

	/// Current health state
	pub fn state(&self) -> NodeHealthState {
		*self.state.borrow()
	}

	/// Watch of the current health state
	pub fn watch_state(&self) -> watch::Receiver<NodeHealthState> {
		self.state.subscribe()
	}

	/// Every state change from now on
	pub fn subscribe_transitions(&self) -> broadcast::Receiver<HealthTransition> {
		self.transitions.subscribe()
	}

	/// Requests an immediate probe
	pub fn wake(&self) {
		self.wake.notify_one();
	}

	fn set_state(&self, to: NodeHealthState) {
		let from = self.state.send_replace(to);
		if from == to {
			return;
		}
		info!(node = %self.node_name, "Health {} -> {}", from, to);
		record_node_health(&self.node_name, to);
		let _ = self.transitions.send(HealthTransition {
			node_name: self.node_name.clone(),
			from,
			to,
		});
	}

	/// Runs one probe and, when it fails, one reconnect round
	///
	/// # Returns
	/// * `NodeHealthState` - State after the probe (and the round, if one ran)
	pub async fn probe(&self, shutdown: &mut watch::Receiver<bool>) -> NodeHealthState {
		let connected = self.source.is_connected().await && self.source.is_subscribed().await;
		let age = self.source.last_block_age().await;
		let stale = age > self.syncing_threshold;

		if !connected || stale {
			if stale && connected {
				warn!(
					node = %self.node_name,
					"No block for {:?}, threshold is {:?}", age, self.syncing_threshold
				);
			}
			self.set_state(NodeHealthState::Failed);
			self.reconnect(shutdown).await;
			return self.state();
		}

		let syncing = match self.source.is_syncing().await {
			Ok(syncing) => syncing,
			Err(e) => {
				warn!(node = %self.node_name, "Could not read syncing status: {}", e);
				false
			}
		};
		self.set_state(if syncing {
			NodeHealthState::Syncing
		} else {
			NodeHealthState::Active
		});
		self.state()
	}

	/// Runs one reconnect round unless one is already running
	///
	/// # Returns
	/// * `bool` - Whether this round restored the stream
	pub async fn reconnect(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
		if self.reconnecting.swap(true, Ordering::SeqCst) {
			return false;
		}
		let restored = self.reconnect_round(shutdown).await;
		self.reconnecting.store(false, Ordering::SeqCst);
		restored
	}

	async fn reconnect_round(&self, shutdown: &mut watch::Receiver<bool>) -> bool {
		self.set_state(NodeHealthState::Reconnecting);

		for (attempt, delay) in self.policy.backoff().enumerate() {
			tokio::select! {
				_ = shutdown.wait_for(|stop| *stop) => return false,
				_ = tokio::time::sleep(delay) => {}
			}

			RECONNECT_ATTEMPTS
				.with_label_values(&[self.node_name.as_str()])
				.inc();
			match self.attempt().await {
				Ok(start_block) => {
					info!(
						node = %self.node_name,
						"Reconnected after {} attempt(s), resuming from block {}",
						attempt + 1,
						start_block
					);
					self.set_state(NodeHealthState::Active);
					return true;
				}
				Err(e) => {
					warn!(node = %self.node_name, "Reconnect attempt {} failed: {}", attempt + 1, e);
				}
			}
		}

		warn!(node = %self.node_name, "Reconnect attempts exhausted");
		self.set_state(NodeHealthState::Failed);
		false
	}

	async fn attempt(&self) -> Result<u64, HealthError> {
		self.source.reconnect_transport().await?;
		self.source.resubscribe().await
	}

	/// Probes on the node's interval until shutdown, then stops the block stream
	pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
		let wake = self.wake.clone();
		self.source
			.on_error(Arc::new(move |error: &BlockWatcherError| {
				warn!("Block stream ended: {}", error);
				wake.notify_one();
			}))
			.await;

		let mut interval = tokio::time::interval(self.probe_interval);
		interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
		// The first tick completes immediately
		interval.tick().await;

		loop {
			tokio::select! {
				_ = shutdown.wait_for(|stop| *stop) => break,
				_ = interval.tick() => {}
				_ = self.wake.notified() => {}
			}
			self.probe(&mut shutdown).await;
		}

		self.source.unsubscribe().await;
		info!(node = %self.node_name, "Health supervisor stopped");
	}

	/// Spawns [`HealthSupervisor::run`] on its own task
	pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
		tokio::spawn(self.run(shutdown))
	}
}
