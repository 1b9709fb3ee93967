//! Bootstrap module for composing the relay at startup.
//!
//! Loads the configuration directory, restores persisted subscriptions and wires every
//! configured node into a running pipeline:
//!
//! node client -> block strategy -> dispatch queue -> matching engine -> broadcaster
//!
//! with a health supervisor per node and a cluster consumer applying peer registry changes.
//!
//! # Components
//! - `RelayConfiguration`: relay settings, nodes, filters and monitoring specs read from disk
//! - `Bootstrapper`: one-shot registration of persisted, configured and factory-built entries
//! - `RelayBuilder` / `Relay`: startup composition and orderly shutdown

use log::error;
use std::{
	collections::{HashMap, HashSet},
	error::Error,
	fmt,
	path::Path,
	sync::Arc,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::{
	models::{ConfigError, ContractEventFilter, Node, RelayConfig, TransactionMonitoringSpec},
	repositories::{
		FileSubscriptionStore, FilterRepository, FilterService, MonitorRepository,
		MonitorService, NodeRepository, NodeService, RepositoryError, SubscriptionStore,
		WritableSubscriptionStore,
	},
	services::{
		blockchain::ClientPool,
		blockwatcher::{
			create_block_strategy, BlockCache, BlockStorage, BlockSubscriptionStrategy,
			FileBlockStorage,
		},
		broadcast::{BroadcastError, BroadcastSink, ChannelSink, EventBroadcaster},
		cluster::{ClusterBus, ClusterConsumer, ClusterError, ClusterPublisher, InMemoryClusterBus},
		dispatch::DispatchQueues,
		filter::{MatchingEngine, ReceiptStatusExtension},
		health::{BackoffReconnectPolicy, HealthSupervisor, StrategyBlockSource},
		registry::SubscriptionRegistry,
	},
	utils::{metrics::BOOTSTRAP_FAILURES, REGISTRY_ACTIVATION_ATTEMPTS, REGISTRY_ACTIVATION_DELAY},
};

/// Represents errors that keep the relay from starting
#[derive(Debug)]
pub enum BootstrapError {
	/// Configuration could not be loaded or is invalid
	ConfigError(String),
	/// A service could not be created
	ServiceError(String),
}

impl BootstrapError {
	fn format_message(&self) -> String {
		match self {
			Self::ConfigError(msg) => format!("Config error: {}", msg),
			Self::ServiceError(msg) => format!("Service error: {}", msg),
		}
	}

	pub fn config_error(msg: impl Into<String>) -> Self {
		let error = Self::ConfigError(msg.into());
		error!("{}", error.format_message());
		error
	}

	pub fn service_error(msg: impl Into<String>) -> Self {
		let error = Self::ServiceError(msg.into());
		error!("{}", error.format_message());
		error
	}
}

impl fmt::Display for BootstrapError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.format_message())
	}
}

impl Error for BootstrapError {}

impl From<ConfigError> for BootstrapError {
	fn from(err: ConfigError) -> Self {
		Self::config_error(err.to_string())
	}
}

impl From<RepositoryError> for BootstrapError {
	fn from(err: RepositoryError) -> Self {
		Self::config_error(err.to_string())
	}
}

impl From<BroadcastError> for BootstrapError {
	fn from(err: BroadcastError) -> Self {
		Self::service_error(err.to_string())
	}
}

impl From<ClusterError> for BootstrapError {
	fn from(err: ClusterError) -> Self {
		Self::service_error(err.to_string())
	}
}

/// Everything read from the configuration directory
#[derive(Debug, Clone, Default)]
pub struct RelayConfiguration {
	pub relay: RelayConfig,
	pub nodes: HashMap<String, Node>,
	/// Configured filters, ordered by id
	pub filters: Vec<ContractEventFilter>,
	/// Configured monitoring specs, ordered by id
	pub monitors: Vec<TransactionMonitoringSpec>,
}

impl RelayConfiguration {
	/// Loads `relay.json`, `nodes/`, `filters/` and `monitors/` from a configuration directory.
	///
	/// The node directory is required. Missing filter and monitor directories mean no
	/// configured entries, and a missing `relay.json` means default settings.
	///
	/// # Arguments
	/// * `config_dir` - Directory holding the configuration files
	///
	/// # Returns
	/// * `Result<Self, BootstrapError>` - The configuration, or the first error found
	pub fn load(config_dir: &Path) -> Result<Self, BootstrapError> {
		let relay = RelayConfig::load(Some(&config_dir.join("relay.json")))?;
		let node_service = NodeService::<NodeRepository>::new(Some(&config_dir.join("nodes")))?;
		let nodes = node_service.get_all();

		let filters_dir = config_dir.join("filters");
		let mut filters: Vec<ContractEventFilter> = if filters_dir.exists() {
			let repository = FilterRepository::new(Some(&filters_dir), Some(node_service.clone()))?;
			FilterService::<NodeRepository, _>::new_with_repository(repository)?
				.get_all()
				.into_values()
				.collect()
		} else {
			Vec::new()
		};
		filters.sort_by(|a, b| a.id.cmp(&b.id));

		let monitors_dir = config_dir.join("monitors");
		let mut monitors: Vec<TransactionMonitoringSpec> = if monitors_dir.exists() {
			let repository = MonitorRepository::new(Some(&monitors_dir), Some(node_service))?;
			MonitorService::<NodeRepository, _>::new_with_repository(repository)?
				.get_all()
				.into_values()
				.collect()
		} else {
			Vec::new()
		};
		monitors.sort_by(|a, b| a.id.cmp(&b.id));

		info!(
			nodes = nodes.len(),
			filters = filters.len(),
			monitors = monitors.len(),
			"Configuration loaded from {}",
			config_dir.display()
		);

		Ok(Self {
			relay,
			nodes,
			filters,
			monitors,
		})
	}
}

/// Builds filters from a source other than the configuration directory
pub trait FilterFactory: Send + Sync {
	fn create_filters(&self, nodes: &HashMap<String, Node>) -> Vec<ContractEventFilter>;
}

/// Outcome of a bootstrap run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapSummary {
	pub filters: usize,
	pub monitors: usize,
	/// Entries that could not be loaded or registered
	pub failures: usize,
}

/// Registers the startup set of filters and monitoring specs.
///
/// Persisted entries come first and win over configured or factory-built entries with the
/// same id. Persisted entries are registered locally only; configured and factory-built
/// entries are persisted and announced to peers.
pub struct Bootstrapper {
	registry: Arc<SubscriptionRegistry>,
	store: Option<Arc<dyn SubscriptionStore>>,
	factories: Vec<Arc<dyn FilterFactory>>,
}

impl Bootstrapper {
	pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
		Self {
			registry,
			store: None,
			factories: Vec::new(),
		}
	}

	pub fn with_store(mut self, store: Arc<dyn SubscriptionStore>) -> Self {
		self.store = Some(store);
		self
	}

	pub fn with_factory(mut self, factory: Arc<dyn FilterFactory>) -> Self {
		self.factories.push(factory);
		self
	}

	/// Registers every entry; single failures are logged and counted, never fatal
	#[instrument(skip_all)]
	pub async fn run(
		&self,
		configured_filters: Vec<ContractEventFilter>,
		configured_monitors: Vec<TransactionMonitoringSpec>,
	) -> BootstrapSummary {
		let mut summary = BootstrapSummary::default();
		let (persisted_filters, persisted_monitors) = self.load_persisted(&mut summary).await;

		let mut seen_filters = HashSet::new();
		for filter in persisted_filters {
			seen_filters.insert(filter.id.clone());
			self.register_filter(filter, false, &mut summary).await;
		}

		let factory_filters = self
			.factories
			.iter()
			.flat_map(|factory| factory.create_filters(self.registry.nodes()));
		for mut filter in configured_filters.into_iter().chain(factory_filters) {
			// Rebuilt on every start, so an id-less filter needs a stable id to match its
			// persisted copy
			filter.ensure_content_id();
			if !seen_filters.insert(filter.id.clone()) {
				debug!(filter = %filter.id, "Filter already registered, skipping");
				continue;
			}
			self.register_filter(filter, true, &mut summary).await;
		}

		let mut seen_monitors = HashSet::new();
		for mut spec in persisted_monitors {
			spec.normalize();
			seen_monitors.insert(spec.id.clone());
			self.register_monitor(spec, false, &mut summary).await;
		}
		for mut spec in configured_monitors {
			spec.normalize();
			if !seen_monitors.insert(spec.id.clone()) {
				debug!(spec = %spec.id, "Monitoring spec already registered, skipping");
				continue;
			}
			self.register_monitor(spec, true, &mut summary).await;
		}

		info!(
			filters = summary.filters,
			monitors = summary.monitors,
			failures = summary.failures,
			"Bootstrap complete"
		);
		summary
	}

	async fn load_persisted(
		&self,
		summary: &mut BootstrapSummary,
	) -> (Vec<ContractEventFilter>, Vec<TransactionMonitoringSpec>) {
		let Some(store) = &self.store else {
			return (Vec::new(), Vec::new());
		};

		let filters = store.load_filters().await.unwrap_or_else(|e| {
			warn!(error = %e, "Failed to load persisted filters");
			Self::count_failure(summary);
			Vec::new()
		});
		let monitors = store.load_monitors().await.unwrap_or_else(|e| {
			warn!(error = %e, "Failed to load persisted monitoring specs");
			Self::count_failure(summary);
			Vec::new()
		});
		(filters, monitors)
	}

	async fn register_filter(
		&self,
		filter: ContractEventFilter,
		broadcast: bool,
		summary: &mut BootstrapSummary,
	) {
		let filter_id = filter.id.clone();
		match self.registry.register_filter(filter, broadcast).await {
			Ok(_) => summary.filters += 1,
			Err(e) => {
				warn!(filter = %filter_id, error = %e, "Failed to register filter at startup");
				Self::count_failure(summary);
			}
		}
	}

	async fn register_monitor(
		&self,
		spec: TransactionMonitoringSpec,
		broadcast: bool,
		summary: &mut BootstrapSummary,
	) {
		let spec_id = spec.id.clone();
		match self
			.registry
			.register_transaction_monitor(spec, broadcast)
			.await
		{
			Ok(_) => summary.monitors += 1,
			Err(e) => {
				warn!(spec = %spec_id, error = %e, "Failed to register monitoring spec at startup");
				Self::count_failure(summary);
			}
		}
	}

	fn count_failure(summary: &mut BootstrapSummary) {
		summary.failures += 1;
		BOOTSTRAP_FAILURES.inc();
	}
}

/// Composes a [`Relay`] from its configuration and optional collaborators.
///
/// Every collaborator left unset falls back to the bundled implementation: JSON-RPC node
/// clients, file-backed checkpoints and subscription store, an in-process cluster bus and
/// the broadcaster configured in `relay.json`.
pub struct RelayBuilder {
	config: RelayConfiguration,
	clients: Option<Arc<ClientPool>>,
	bus: Option<Arc<dyn ClusterBus>>,
	store: Option<Arc<dyn WritableSubscriptionStore>>,
	block_storage: Option<Arc<dyn BlockStorage>>,
	sink: Option<Arc<dyn BroadcastSink>>,
	factories: Vec<Arc<dyn FilterFactory>>,
}

impl RelayBuilder {
	pub fn new(config: RelayConfiguration) -> Self {
		Self {
			config,
			clients: None,
			bus: None,
			store: None,
			block_storage: None,
			sink: None,
			factories: Vec::new(),
		}
	}

	pub fn with_clients(mut self, clients: Arc<ClientPool>) -> Self {
		self.clients = Some(clients);
		self
	}

	/// Shares a cluster bus with peer instances
	pub fn with_cluster_bus(mut self, bus: Arc<dyn ClusterBus>) -> Self {
		self.bus = Some(bus);
		self
	}

	pub fn with_subscription_store(mut self, store: Arc<dyn WritableSubscriptionStore>) -> Self {
		self.store = Some(store);
		self
	}

	pub fn with_block_storage(mut self, storage: Arc<dyn BlockStorage>) -> Self {
		self.block_storage = Some(storage);
		self
	}

	/// Publishes through `sink` instead of the configured broadcaster
	pub fn with_broadcast_sink(mut self, sink: Arc<dyn BroadcastSink>) -> Self {
		self.sink = Some(sink);
		self
	}

	pub fn with_filter_factory(mut self, factory: Arc<dyn FilterFactory>) -> Self {
		self.factories.push(factory);
		self
	}

	/// Starts the relay.
	///
	/// The cluster consumer is running before the startup set is registered, and every
	/// subscription is registered before the first block is requested.
	///
	/// # Returns
	/// * `Result<Relay, BootstrapError>` - The running relay; nodes whose client cannot be
	///   created are logged and left out
	pub async fn start(self) -> Result<Relay, BootstrapError> {
		let RelayBuilder {
			config,
			clients,
			bus,
			store,
			block_storage,
			sink,
			factories,
		} = self;
		let RelayConfiguration {
			relay,
			nodes,
			filters,
			monitors,
		} = config;
		relay.validate().map_err(BootstrapError::config_error)?;

		let instance_id = relay.resolve_instance_id();
		info!(instance = %instance_id, "Starting relay");
		let (shutdown_tx, shutdown_rx) = watch::channel(false);

		let clients = clients.unwrap_or_else(|| Arc::new(ClientPool::new()));
		let bus: Arc<dyn ClusterBus> = match bus {
			Some(bus) => bus,
			None => Arc::new(InMemoryClusterBus::default()),
		};
		let store: Arc<dyn WritableSubscriptionStore> = match store {
			Some(store) => store,
			None => Arc::new(FileSubscriptionStore::new(&relay.storage_path)),
		};
		let block_storage: Arc<dyn BlockStorage> = match block_storage {
			Some(storage) => storage,
			None => Arc::new(FileBlockStorage::new(&relay.storage_path)),
		};

		let (broadcaster, channel) = match sink {
			Some(sink) => (EventBroadcaster::new(sink, relay.destinations.clone()), None),
			None => EventBroadcaster::from_config(&relay.broadcaster, relay.destinations.clone())?,
		};
		let broadcaster = Arc::new(broadcaster);

		let publisher = ClusterPublisher::new(bus.clone(), instance_id.clone(), relay.cluster.clone());
		let registry = Arc::new(
			SubscriptionRegistry::new(nodes.clone())
				.with_store(store.clone())
				.with_cluster(publisher)
				.with_clients(
					clients.clone(),
					REGISTRY_ACTIVATION_ATTEMPTS,
					REGISTRY_ACTIVATION_DELAY,
				),
		);

		let mut tasks = Vec::new();
		let consumer = ClusterConsumer::new(instance_id.clone(), registry.clone(), relay.cluster.clone());
		tasks.push(consumer.spawn(bus, shutdown_rx.clone()).await?);

		let mut bootstrapper =
			Bootstrapper::new(registry.clone()).with_store(store as Arc<dyn SubscriptionStore>);
		for factory in factories {
			bootstrapper = bootstrapper.with_factory(factory);
		}
		let summary = bootstrapper.run(filters, monitors).await;

		let queues = Arc::new(DispatchQueues::new(shutdown_rx.clone()));
		let wiring = NodeWiring {
			relay: &relay,
			clients: &clients,
			cache: Arc::new(BlockCache::new(relay.block_cache_size)),
			block_storage,
			registry: registry.clone(),
			broadcaster: broadcaster.clone(),
			queues: queues.clone(),
		};

		let mut node_names: Vec<&String> = nodes.keys().collect();
		node_names.sort();
		let mut strategies = HashMap::new();
		let mut supervisors = HashMap::new();
		for name in node_names {
			let node = &nodes[name];
			match wiring.start_node(node, shutdown_rx.clone()).await {
				Ok(started) => {
					tasks.push(started.task);
					strategies.insert(node.name.clone(), started.strategy);
					supervisors.insert(node.name.clone(), started.supervisor);
				}
				Err(e) => error!("Node '{}' was not started: {}", node.name, e),
			}
		}

		info!(
			instance = %instance_id,
			nodes = supervisors.len(),
			"Relay started"
		);

		Ok(Relay {
			instance_id,
			registry,
			broadcaster,
			channel,
			strategies,
			supervisors,
			queues,
			tasks,
			shutdown: shutdown_tx,
			summary,
		})
	}
}

struct StartedNode {
	strategy: Arc<dyn BlockSubscriptionStrategy>,
	supervisor: Arc<HealthSupervisor>,
	task: JoinHandle<()>,
}

/// Shared collaborators used to start each node
struct NodeWiring<'a> {
	relay: &'a RelayConfig,
	clients: &'a Arc<ClientPool>,
	cache: Arc<BlockCache>,
	block_storage: Arc<dyn BlockStorage>,
	registry: Arc<SubscriptionRegistry>,
	broadcaster: Arc<EventBroadcaster>,
	queues: Arc<DispatchQueues>,
}

impl NodeWiring<'_> {
	#[instrument(skip_all, fields(node = %node.name))]
	async fn start_node(
		&self,
		node: &Node,
		shutdown: watch::Receiver<bool>,
	) -> Result<StartedNode, BootstrapError> {
		let client = self.clients.get_client(node).await.map_err(|e| {
			BootstrapError::service_error(format!("Failed to create client for '{}': {}", node.name, e))
		})?;

		let strategy = create_block_strategy(
			node,
			client.clone(),
			self.cache.clone(),
			self.block_storage.clone(),
		);
		let engine = Arc::new(
			MatchingEngine::new(client.clone(), self.registry.clone())
				.with_extension(Arc::new(ReceiptStatusExtension))
				.with_contract_event_listener(self.broadcaster.clone())
				.with_transaction_listener(self.broadcaster.clone()),
		);
		strategy.add_block_listener(self.broadcaster.clone()).await;
		strategy
			.add_block_listener(engine.into_block_listener(self.queues.clone()))
			.await;

		let supervisor = Arc::new(HealthSupervisor::new(
			node,
			Arc::new(StrategyBlockSource::new(strategy.clone(), client)),
			Arc::new(BackoffReconnectPolicy::from(&self.relay.reconnect)),
		));
		let task = supervisor.clone().spawn(shutdown);

		// A failed first subscription is picked up by the supervisor's next probe.
		match strategy.subscribe().await {
			Ok(handle) => info!(start_block = handle.start_block(), "Block subscription started"),
			Err(e) => warn!(error = %e, "Initial block subscription failed"),
		}

		Ok(StartedNode {
			strategy,
			supervisor,
			task,
		})
	}
}

/// A running relay instance
pub struct Relay {
	instance_id: String,
	registry: Arc<SubscriptionRegistry>,
	broadcaster: Arc<EventBroadcaster>,
	channel: Option<Arc<ChannelSink>>,
	strategies: HashMap<String, Arc<dyn BlockSubscriptionStrategy>>,
	supervisors: HashMap<String, Arc<HealthSupervisor>>,
	queues: Arc<DispatchQueues>,
	tasks: Vec<JoinHandle<()>>,
	shutdown: watch::Sender<bool>,
	summary: BootstrapSummary,
}

impl Relay {
	pub fn builder(config: RelayConfiguration) -> RelayBuilder {
		RelayBuilder::new(config)
	}

	pub fn instance_id(&self) -> &str {
		&self.instance_id
	}

	pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
		&self.registry
	}

	pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
		&self.broadcaster
	}

	/// In-process channel receiving every broadcast, when the channel broadcaster is used
	pub fn channel(&self) -> Option<&Arc<ChannelSink>> {
		self.channel.as_ref()
	}

	pub fn strategy(&self, node_name: &str) -> Option<&Arc<dyn BlockSubscriptionStrategy>> {
		self.strategies.get(node_name)
	}

	pub fn supervisor(&self, node_name: &str) -> Option<&Arc<HealthSupervisor>> {
		self.supervisors.get(node_name)
	}

	pub fn summary(&self) -> BootstrapSummary {
		self.summary
	}

	/// Stops every task, then drains the dispatch queues
	pub async fn shutdown(self) {
		info!(instance = %self.instance_id, "Shutting down relay");
		let _ = self.shutdown.send(true);

		for task in self.tasks {
			if let Err(e) = task.await {
				error!("Relay task failed during shutdown: {}", e);
			}
		}
		self.queues.close().await;
		info!(instance = %self.instance_id, "Shutdown complete");
	}
}
