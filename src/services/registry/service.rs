//! Subscription registry.
//!
//! Holds the contract event filters and transaction monitoring specs of this instance.
//! Mutations of one id are serialized through a per-id lock; matching reads snapshots in
//! registration order and never blocks on a mutation of another id.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::{
	collections::HashMap,
	future::Future,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::{
	models::{ClusterControlMessage, ContractEventFilter, Node, TransactionMonitoringSpec},
	repositories::WritableSubscriptionStore,
	services::{
		blockchain::ClientPool,
		cluster::{ClusterError, ClusterMessageHandler, ClusterPublisher},
		filter::TransactionMatchingCriteria,
		registry::RegistryError,
	},
	utils::metrics::update_registry_metrics,
};

/// A registered spec together with its compiled criteria
#[derive(Debug, Clone)]
pub struct RegisteredMonitor {
	pub spec: TransactionMonitoringSpec,
	pub criteria: TransactionMatchingCriteria,
}

struct Entry<T> {
	sequence: u64,
	value: T,
}

#[derive(Default)]
struct RegistryState {
	filters: HashMap<String, Entry<ContractEventFilter>>,
	monitors: HashMap<String, Entry<RegisteredMonitor>>,
}

fn in_registration_order<T: Clone>(mut entries: Vec<&Entry<T>>) -> Vec<T> {
	entries.sort_by_key(|entry| entry.sequence);
	entries.into_iter().map(|entry| entry.value.clone()).collect()
}

/// Registry of active filters and monitoring specs
pub struct SubscriptionRegistry {
	nodes: HashMap<String, Node>,
	state: RwLock<RegistryState>,
	key_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
	sequence: AtomicU64,
	store: Option<Arc<dyn WritableSubscriptionStore>>,
	cluster: Option<ClusterPublisher>,
	clients: Option<Arc<ClientPool>>,
	activation_attempts: usize,
	activation_delay: Duration,
}

impl SubscriptionRegistry {
	/// Creates a registry accepting filters and specs for the given nodes
	pub fn new(nodes: HashMap<String, Node>) -> Self {
		Self {
			nodes,
			state: RwLock::new(RegistryState::default()),
			key_locks: Mutex::new(HashMap::new()),
			sequence: AtomicU64::new(0),
			store: None,
			cluster: None,
			clients: None,
			activation_attempts: 3,
			activation_delay: Duration::from_millis(200),
		}
	}

	/// Persists local changes through the store
	pub fn with_store(mut self, store: Arc<dyn WritableSubscriptionStore>) -> Self {
		self.store = Some(store);
		self
	}

	/// Publishes local changes to peer instances
	pub fn with_cluster(mut self, publisher: ClusterPublisher) -> Self {
		self.cluster = Some(publisher);
		self
	}

	/// Checks that a node answers before a subscription for it is activated
	///
	/// # Arguments
	/// * `clients` - Pool providing node clients
	/// * `attempts` - Retries after the first failed check
	/// * `delay` - Delay before the first retry, doubled on every further retry
	pub fn with_clients(
		mut self,
		clients: Arc<ClientPool>,
		attempts: usize,
		delay: Duration,
	) -> Self {
		self.clients = Some(clients);
		self.activation_attempts = attempts;
		self.activation_delay = delay;
		self
	}

	pub fn node(&self, node_name: &str) -> Option<&Node> {
		self.nodes.get(node_name)
	}

	/// Nodes this registry accepts subscriptions for
	pub fn nodes(&self) -> &HashMap<String, Node> {
		&self.nodes
	}

	/// Registers a contract event filter.
	///
	/// Registering an id that is already present is accepted without changes. When
	/// `broadcast` is set the filter is persisted and published to peers, which register it
	/// with `broadcast` unset.
	///
	/// # Returns
	/// * `Result<String, RegistryError>` - The filter id, generated when the filter had none
	pub async fn register_filter(
		&self,
		mut filter: ContractEventFilter,
		broadcast: bool,
	) -> Result<String, RegistryError> {
		filter.ensure_id();
		filter.validate().map_err(RegistryError::validation_error)?;
		let node = self.known_node(&filter.node_name)?;
		let filter_id = filter.id.clone();

		self.serialized(
			format!("filter:{}", filter_id),
			self.add_filter(filter, node, broadcast),
		)
		.await?;
		Ok(filter_id)
	}

	/// Removes a contract event filter.
	///
	/// Removing an unknown id succeeds. When `broadcast` is set the removal is persisted and
	/// published to peers even if this instance did not hold the filter.
	///
	/// # Returns
	/// * `Result<bool, RegistryError>` - Whether this instance held the filter
	pub async fn unregister_filter(
		&self,
		filter_id: &str,
		broadcast: bool,
	) -> Result<bool, RegistryError> {
		self.serialized(
			format!("filter:{}", filter_id),
			self.remove_filter(filter_id, broadcast),
		)
		.await
	}

	/// Registers a transaction monitoring spec.
	///
	/// The spec is normalized first, so its id is the deterministic one. Specs whose type
	/// cannot be compiled into criteria are rejected.
	///
	/// # Returns
	/// * `Result<String, RegistryError>` - The spec id
	pub async fn register_transaction_monitor(
		&self,
		mut spec: TransactionMonitoringSpec,
		broadcast: bool,
	) -> Result<String, RegistryError> {
		spec.normalize();
		spec.validate().map_err(RegistryError::validation_error)?;
		let node = self.known_node(&spec.node_name)?;
		let criteria = TransactionMatchingCriteria::compile(&spec)?;
		let spec_id = spec.id.clone();

		self.serialized(
			format!("monitor:{}", spec_id),
			self.add_monitor(RegisteredMonitor { spec, criteria }, node, broadcast),
		)
		.await?;
		Ok(spec_id)
	}

	/// Removes a transaction monitoring spec; unknown ids succeed
	pub async fn unregister_transaction_monitor(
		&self,
		spec_id: &str,
		broadcast: bool,
	) -> Result<bool, RegistryError> {
		self.serialized(
			format!("monitor:{}", spec_id),
			self.remove_monitor(spec_id, broadcast),
		)
		.await
	}

	/// Atomically removes a one-time spec after it matched.
	///
	/// Exactly one of several concurrent callers for the same id wins. The winner's removal
	/// is persisted and published like a local unregistration.
	///
	/// # Returns
	/// * `bool` - Whether this caller removed the spec
	pub async fn claim_one_time_monitor(&self, spec_id: &str) -> bool {
		let claimed = self
			.serialized(format!("monitor:{}", spec_id), async {
				let mut state = self.state.write().await;
				let removed = state.monitors.remove(spec_id).is_some();
				update_registry_metrics(state.filters.len(), state.monitors.len());
				removed
			})
			.await;

		if claimed {
			info!(spec_id = %spec_id, "One-time monitor matched and was removed");
			self.persist_monitor_removal(spec_id).await;
			self.publish(ClusterControlMessage::MonitorRemoved {
				spec_id: spec_id.to_string(),
			})
			.await;
		}
		claimed
	}

	/// Filters of a node in registration order
	pub async fn filters_for_node(&self, node_name: &str) -> Vec<ContractEventFilter> {
		let state = self.state.read().await;
		in_registration_order(
			state
				.filters
				.values()
				.filter(|entry| entry.value.node_name == node_name)
				.collect(),
		)
	}

	/// Compiled criteria of a node in registration order
	pub async fn monitors_for_node(&self, node_name: &str) -> Vec<TransactionMatchingCriteria> {
		let state = self.state.read().await;
		in_registration_order(
			state
				.monitors
				.values()
				.filter(|entry| entry.value.spec.node_name == node_name)
				.collect(),
		)
		.into_iter()
		.map(|monitor: RegisteredMonitor| monitor.criteria)
		.collect()
	}

	pub async fn filter(&self, filter_id: &str) -> Option<ContractEventFilter> {
		let state = self.state.read().await;
		state.filters.get(filter_id).map(|entry| entry.value.clone())
	}

	pub async fn monitor(&self, spec_id: &str) -> Option<TransactionMonitoringSpec> {
		let state = self.state.read().await;
		state.monitors.get(spec_id).map(|entry| entry.value.spec.clone())
	}

	pub async fn filter_count(&self) -> usize {
		self.state.read().await.filters.len()
	}

	pub async fn monitor_count(&self) -> usize {
		self.state.read().await.monitors.len()
	}

	fn known_node(&self, node_name: &str) -> Result<Node, RegistryError> {
		self.nodes.get(node_name).cloned().ok_or_else(|| {
			RegistryError::validation_error(format!("node '{}' is not configured", node_name))
		})
	}

	/// Runs `operation` while holding the lock of `key`
	async fn serialized<T>(&self, key: String, operation: impl Future<Output = T>) -> T {
		let lock = self
			.key_locks
			.lock()
			.await
			.entry(key.clone())
			.or_default()
			.clone();

		let result = {
			let _guard = lock.lock().await;
			operation.await
		};

		// Only the map and this call hold the lock: nobody is waiting for it.
		let mut locks = self.key_locks.lock().await;
		if Arc::strong_count(&lock) <= 2 {
			locks.remove(&key);
		}
		result
	}

	async fn add_filter(
		&self,
		filter: ContractEventFilter,
		node: Node,
		broadcast: bool,
	) -> Result<(), RegistryError> {
		if self.state.read().await.filters.contains_key(&filter.id) {
			debug!(filter_id = %filter.id, "Filter already registered");
			return Ok(());
		}

		self.check_node_reachable(&node).await;
		if broadcast {
			if let Some(store) = &self.store {
				store.save_filter(&filter).await?;
			}
		}

		{
			let mut state = self.state.write().await;
			state.filters.insert(
				filter.id.clone(),
				Entry {
					sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
					value: filter.clone(),
				},
			);
			update_registry_metrics(state.filters.len(), state.monitors.len());
		}
		info!(
			filter_id = %filter.id,
			node = %filter.node_name,
			event = %filter.event_signature,
			broadcast,
			"Registered contract event filter"
		);

		if broadcast {
			self.publish(ClusterControlMessage::FilterAdded(filter)).await;
		}
		Ok(())
	}

	async fn remove_filter(&self, filter_id: &str, broadcast: bool) -> Result<bool, RegistryError> {
		let removed = {
			let mut state = self.state.write().await;
			let removed = state.filters.remove(filter_id).is_some();
			update_registry_metrics(state.filters.len(), state.monitors.len());
			removed
		};
		if removed {
			info!(filter_id = %filter_id, broadcast, "Unregistered contract event filter");
		} else {
			debug!(filter_id = %filter_id, "Filter to unregister was not registered");
		}

		if broadcast {
			if let Some(store) = &self.store {
				store.delete_filter(filter_id).await?;
			}
			self.publish(ClusterControlMessage::FilterRemoved {
				filter_id: filter_id.to_string(),
			})
			.await;
		}
		Ok(removed)
	}

	async fn add_monitor(
		&self,
		monitor: RegisteredMonitor,
		node: Node,
		broadcast: bool,
	) -> Result<(), RegistryError> {
		let spec_id = monitor.spec.id.clone();
		if self.state.read().await.monitors.contains_key(&spec_id) {
			debug!(spec_id = %spec_id, "Monitor already registered");
			return Ok(());
		}

		self.check_node_reachable(&node).await;
		if broadcast {
			if let Some(store) = &self.store {
				store.save_monitor(&monitor.spec).await?;
			}
		}

		let spec = monitor.spec.clone();
		{
			let mut state = self.state.write().await;
			state.monitors.insert(
				spec_id.clone(),
				Entry {
					sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
					value: monitor,
				},
			);
			update_registry_metrics(state.filters.len(), state.monitors.len());
		}
		info!(
			spec_id = %spec_id,
			node = %spec.node_name,
			identifier_type = spec.type_.as_str(),
			broadcast,
			"Registered transaction monitor"
		);

		if broadcast {
			self.publish(ClusterControlMessage::MonitorAdded(spec)).await;
		}
		Ok(())
	}

	async fn remove_monitor(&self, spec_id: &str, broadcast: bool) -> Result<bool, RegistryError> {
		let removed = {
			let mut state = self.state.write().await;
			let removed = state.monitors.remove(spec_id).is_some();
			update_registry_metrics(state.filters.len(), state.monitors.len());
			removed
		};
		if removed {
			info!(spec_id = %spec_id, broadcast, "Unregistered transaction monitor");
		} else {
			debug!(spec_id = %spec_id, "Monitor to unregister was not registered");
		}

		if broadcast {
			if let Some(store) = &self.store {
				store.delete_monitor(spec_id).await?;
			}
			self.publish(ClusterControlMessage::MonitorRemoved {
				spec_id: spec_id.to_string(),
			})
			.await;
		}
		Ok(removed)
	}

	async fn persist_monitor_removal(&self, spec_id: &str) {
		if let Some(store) = &self.store {
			if let Err(e) = store.delete_monitor(spec_id).await {
				warn!(spec_id = %spec_id, error = %e, "Failed to delete claimed monitor");
			}
		}
	}

	async fn publish(&self, message: ClusterControlMessage) {
		let Some(cluster) = &self.cluster else {
			return;
		};
		let kind = message.kind();
		let entity_id = message.entity_id().to_string();
		if let Err(e) = cluster.publish(message).await {
			warn!(
				kind,
				entity_id = %entity_id,
				error = %e,
				"Peers were not told about a registry change"
			);
		}
	}

	async fn check_node_reachable(&self, node: &Node) {
		let Some(clients) = &self.clients else {
			return;
		};

		let backoff = ExponentialBuilder::default()
			.with_min_delay(self.activation_delay)
			.with_max_delay(self.activation_delay * 8)
			.with_max_times(self.activation_attempts);
		let result = (|| async {
			let client = match clients.get_client(node).await {
				Ok(client) => client,
				Err(e) => return Err(e.to_string()),
			};
			if client.is_connected().await {
				Ok(())
			} else {
				Err(format!("node '{}' is not answering", node.name))
			}
		})
		.retry(backoff)
		.sleep(tokio::time::sleep)
		.await;

		if let Err(e) = result {
			warn!(
				node = %node.name,
				error = %e,
				"Node unreachable at registration, matching starts once it recovers"
			);
		}
	}
}

#[async_trait]
impl ClusterMessageHandler for SubscriptionRegistry {
	async fn handle(&self, message: ClusterControlMessage) -> Result<(), ClusterError> {
		let result = match message {
			ClusterControlMessage::FilterAdded(filter) => {
				self.register_filter(filter, false).await.map(|_| ())
			}
			ClusterControlMessage::FilterRemoved { filter_id } => {
				self.unregister_filter(&filter_id, false).await.map(|_| ())
			}
			ClusterControlMessage::MonitorAdded(spec) => self
				.register_transaction_monitor(spec, false)
				.await
				.map(|_| ()),
			ClusterControlMessage::MonitorRemoved { spec_id } => self
				.unregister_transaction_monitor(&spec_id, false)
				.await
				.map(|_| ()),
		};

		match result {
			Ok(()) => Ok(()),
			// Peers may watch nodes or spec types this instance does not handle.
			Err(RegistryError::ValidationError(msg))
			| Err(RegistryError::UnsupportedCriteria(msg)) => {
				warn!(reason = %msg, "Ignoring cluster message this instance cannot apply");
				Ok(())
			}
			Err(e) => Err(ClusterError::handler_error(e.to_string())),
		}
	}
}
