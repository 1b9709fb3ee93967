//! Block subscription strategies.
//!
//! A strategy turns one node into an ordered, resumable stream of blocks. The stream is
//! produced by a [`BlockStreamDriver`] (polling or push) running on its own task, and every
//! block is handed to the registered [`BlockListener`]s in registration order on that task.
//!
//! Strategies never retry on their own: a transport error ends the running subscription and
//! is reported through the error callback. Recovery belongs to the health supervisor.

use async_trait::async_trait;
use std::{
	fmt,
	sync::{
		atomic::{AtomicBool, AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};
use tokio::{
	sync::{watch, Mutex, RwLock},
	task::JoinHandle,
	time::Instant,
};
use tracing::{debug, info, warn};

use crate::{
	models::{Block, BlockStrategyType, Node},
	services::{
		blockchain::{BlockChainError, NodeClient},
		blockwatcher::{
			BlockCache, BlockCheckResult, BlockStorage, BlockWatcherError, PollingDriver,
			PushDriver,
		},
	},
	utils::metrics::BLOCKS_PROCESSED,
};

/// Identifier returned when a listener is registered
pub type ListenerId = u64;

/// Callback receiving errors that ended a subscription
pub type ErrorCallback = Arc<dyn Fn(&BlockWatcherError) + Send + Sync>;

/// Receives every block delivered by a strategy
#[async_trait]
pub trait BlockListener: Send + Sync {
	/// Called on the strategy's delivery task, in registration order
	async fn on_block(&self, block: Arc<Block>);
}

/// Observer of one running subscription
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
	id: u64,
	start_block: u64,
	finished: Arc<AtomicBool>,
}

impl SubscriptionHandle {
	pub fn id(&self) -> u64 {
		self.id
	}

	/// Block the subscription started from
	pub fn start_block(&self) -> u64 {
		self.start_block
	}

	/// Whether the subscription task is still delivering blocks
	pub fn is_active(&self) -> bool {
		!self.finished.load(Ordering::SeqCst)
	}
}

/// A running subscription; dropping it stops the task
struct ActiveSubscription {
	handle: SubscriptionHandle,
	cancel: watch::Sender<bool>,
	task: JoinHandle<()>,
}

impl Drop for ActiveSubscription {
	fn drop(&mut self) {
		let _ = self.cancel.send(true);
		self.task.abort();
	}
}

/// Ordered, resumable stream of blocks for one node
#[async_trait]
pub trait BlockSubscriptionStrategy: Send + Sync {
	/// Node the strategy reads from
	fn node(&self) -> &Node;

	/// Whether blocks are polled or pushed
	fn kind(&self) -> BlockStrategyType;

	/// Starts delivering blocks from [`BlockSubscriptionStrategy::start_block`].
	///
	/// Subscribing while a subscription is running returns the running handle.
	async fn subscribe(&self) -> Result<SubscriptionHandle, BlockWatcherError>;

	/// Stops the running subscription; does nothing when none is running
	async fn unsubscribe(&self);

	async fn add_block_listener(&self, listener: Arc<dyn BlockListener>) -> ListenerId;

	/// Removes a listener, returning it when it was registered
	async fn remove_block_listener(&self, id: ListenerId) -> Option<Arc<dyn BlockListener>>;

	/// Registered listeners in registration order
	async fn block_listeners(&self) -> Vec<(ListenerId, Arc<dyn BlockListener>)>;

	/// Block the next subscription starts from.
	///
	/// The larger of the node's configured start block and its checkpoint. Without either,
	/// the node's current head.
	async fn start_block(&self) -> Result<u64, BlockWatcherError>;

	async fn is_subscribed(&self) -> bool;

	/// Time since the last delivered block, or since the subscription started
	async fn last_block_age(&self) -> Duration;

	/// Registers the callback told about errors that end a subscription
	async fn set_error_callback(&self, callback: ErrorCallback);
}

/// Outcome of fetching one block by number
#[derive(Debug)]
pub enum FetchOutcome {
	Block(Block),
	/// The node does not have the block yet
	NotAvailable,
	/// The node returned a block that failed validation; it was dropped
	Malformed,
}

/// State shared between a strategy and its running driver
pub struct StrategyCore {
	node: Node,
	client: Arc<dyn NodeClient>,
	cache: Arc<BlockCache>,
	storage: Arc<dyn BlockStorage>,
	listeners: RwLock<Vec<(ListenerId, Arc<dyn BlockListener>)>>,
	next_listener_id: AtomicU64,
	last_activity: Mutex<Instant>,
	error_callback: RwLock<Option<ErrorCallback>>,
}

impl StrategyCore {
	pub fn new(
		node: Node,
		client: Arc<dyn NodeClient>,
		cache: Arc<BlockCache>,
		storage: Arc<dyn BlockStorage>,
	) -> Self {
		Self {
			node,
			client,
			cache,
			storage,
			listeners: RwLock::new(Vec::new()),
			next_listener_id: AtomicU64::new(1),
			last_activity: Mutex::new(Instant::now()),
			error_callback: RwLock::new(None),
		}
	}

	pub fn node(&self) -> &Node {
		&self.node
	}

	pub fn client(&self) -> &Arc<dyn NodeClient> {
		&self.client
	}

	/// Fetches and validates one block
	pub async fn fetch_block(&self, number: u64) -> Result<FetchOutcome, BlockChainError> {
		match self.client.get_block_by_number(number).await {
			Ok(Some(block)) => match block.validate(&self.node.name, Some(number)) {
				Ok(()) => Ok(FetchOutcome::Block(block)),
				Err(reason) => {
					warn!(node = %self.node.name, "Dropping malformed block {}: {}", number, reason);
					Ok(FetchOutcome::Malformed)
				}
			},
			Ok(None) => Ok(FetchOutcome::NotAvailable),
			Err(BlockChainError::MalformedData(reason)) => {
				warn!(node = %self.node.name, "Dropping malformed block {}: {}", number, reason);
				Ok(FetchOutcome::Malformed)
			}
			Err(BlockChainError::BlockNotFound(_)) => Ok(FetchOutcome::NotAvailable),
			Err(e) => Err(e),
		}
	}

	/// Delivers a block to every listener, then records it as the node's checkpoint
	pub async fn trigger_listeners(&self, block: Block) {
		match self.cache.check_block(&block).await {
			BlockCheckResult::Ok => {}
			BlockCheckResult::Duplicate => {
				debug!(node = %self.node.name, "Redelivering block {}", block.number);
			}
			BlockCheckResult::OutOfOrder { expected, received } => {
				debug!(
					node = %self.node.name,
					"Delivering block {} behind expected {}", received, expected
				);
			}
		}

		let block = Arc::new(block);
		let listeners = self.listeners.read().await.clone();
		for (_, listener) in listeners.iter() {
			listener.on_block(block.clone()).await;
		}

		self.cache.record(&block).await;
		if let Err(e) = self
			.storage
			.save_last_processed_block(&self.node.name, block.number)
			.await
		{
			warn!(node = %self.node.name, "Failed to save checkpoint {}: {}", block.number, e);
		}
		*self.last_activity.lock().await = Instant::now();
		BLOCKS_PROCESSED
			.with_label_values(&[self.node.name.as_str()])
			.inc();
	}

	/// Tells the error callback about an error that ended the subscription
	pub async fn report_error(&self, error: &BlockWatcherError) {
		if let Some(callback) = self.error_callback.read().await.as_ref() {
			callback(error);
		}
	}

	async fn checkpoint(&self) -> Option<u64> {
		if let Some(number) = self.cache.last_block(&self.node.name).await {
			return Some(number);
		}
		match self.storage.get_last_processed_block(&self.node.name).await {
			Ok(checkpoint) => checkpoint,
			Err(e) => {
				warn!(node = %self.node.name, "Ignoring unreadable checkpoint: {}", e);
				None
			}
		}
	}

	async fn start_block(&self) -> Result<u64, BlockWatcherError> {
		match (self.node.start_block, self.checkpoint().await) {
			(Some(configured), Some(checkpoint)) => Ok(configured.max(checkpoint)),
			(Some(start), None) | (None, Some(start)) => Ok(start),
			(None, None) => Ok(self.client.get_latest_block_number().await?),
		}
	}
}

/// Produces blocks for a running subscription
#[async_trait]
pub trait BlockStreamDriver: Send + Sync {
	fn kind(&self) -> BlockStrategyType;

	/// Delivers blocks from `start_block` until cancelled or the transport fails
	async fn run(
		&self,
		core: Arc<StrategyCore>,
		start_block: u64,
		cancel: watch::Receiver<bool>,
	) -> Result<(), BlockWatcherError>;
}

/// Resolves once the subscription is cancelled or its owner is gone
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
	let _ = cancel.wait_for(|cancelled| *cancelled).await;
}

/// Block subscription strategy for one node, driven by a polling or push driver
pub struct BlockSubscription {
	core: Arc<StrategyCore>,
	driver: Arc<dyn BlockStreamDriver>,
	active: Mutex<Option<ActiveSubscription>>,
	next_subscription_id: AtomicU64,
}

impl BlockSubscription {
	pub fn new(core: StrategyCore, driver: Arc<dyn BlockStreamDriver>) -> Self {
		Self {
			core: Arc::new(core),
			driver,
			active: Mutex::new(None),
			next_subscription_id: AtomicU64::new(1),
		}
	}
}

impl fmt::Debug for BlockSubscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("BlockSubscription")
			.field("node", &self.core.node.name)
			.field("kind", &self.driver.kind())
			.finish()
	}
}

#[async_trait]
impl BlockSubscriptionStrategy for BlockSubscription {
	fn node(&self) -> &Node {
		&self.core.node
	}

	fn kind(&self) -> BlockStrategyType {
		self.driver.kind()
	}

	async fn subscribe(&self) -> Result<SubscriptionHandle, BlockWatcherError> {
		let mut active = self.active.lock().await;
		if let Some(running) = active.as_ref() {
			if running.handle.is_active() {
				return Ok(running.handle.clone());
			}
		}

		let start_block = self.core.start_block().await.map_err(|e| {
			BlockWatcherError::subscription_error(format!(
				"Cannot resolve start block for '{}': {}",
				self.core.node.name, e
			))
		})?;

		let handle = SubscriptionHandle {
			id: self.next_subscription_id.fetch_add(1, Ordering::Relaxed),
			start_block,
			finished: Arc::new(AtomicBool::new(false)),
		};
		let (cancel, cancel_rx) = watch::channel(false);
		*self.core.last_activity.lock().await = Instant::now();

		let core = self.core.clone();
		let driver = self.driver.clone();
		let finished = handle.finished.clone();
		let task = tokio::spawn(async move {
			if let Err(e) = driver.run(core.clone(), start_block, cancel_rx).await {
				core.report_error(&e).await;
			}
			finished.store(true, Ordering::SeqCst);
		});

		info!(
			node = %self.core.node.name,
			"Subscribed to {:?} blocks from {}", self.driver.kind(), start_block
		);
		// Replacing a finished subscription drops it
		*active = Some(ActiveSubscription {
			handle: handle.clone(),
			cancel,
			task,
		});
		Ok(handle)
	}

	async fn unsubscribe(&self) {
		if let Some(running) = self.active.lock().await.take() {
			info!(node = %self.core.node.name, "Unsubscribed from blocks");
			drop(running);
		}
	}

	async fn add_block_listener(&self, listener: Arc<dyn BlockListener>) -> ListenerId {
		let id = self.core.next_listener_id.fetch_add(1, Ordering::Relaxed);
		self.core.listeners.write().await.push((id, listener));
		id
	}

	async fn remove_block_listener(&self, id: ListenerId) -> Option<Arc<dyn BlockListener>> {
		let mut listeners = self.core.listeners.write().await;
		let position = listeners.iter().position(|(existing, _)| *existing == id)?;
		Some(listeners.remove(position).1)
	}

	async fn block_listeners(&self) -> Vec<(ListenerId, Arc<dyn BlockListener>)> {
		self.core.listeners.read().await.clone()
	}

	async fn start_block(&self) -> Result<u64, BlockWatcherError> {
		self.core.start_block().await
	}

	async fn is_subscribed(&self) -> bool {
		self.active
			.lock()
			.await
			.as_ref()
			.map(|running| running.handle.is_active())
			.unwrap_or(false)
	}

	async fn last_block_age(&self) -> Duration {
		self.core.last_activity.lock().await.elapsed()
	}

	async fn set_error_callback(&self, callback: ErrorCallback) {
		*self.core.error_callback.write().await = Some(callback);
	}
}

/// Creates the strategy for a node.
///
/// Chosen once from the node's configuration: mirror nodes and clients without push
/// support poll, everything else configured for push is pushed.
pub fn create_block_strategy(
	node: &Node,
	client: Arc<dyn NodeClient>,
	cache: Arc<BlockCache>,
	storage: Arc<dyn BlockStorage>,
) -> Arc<dyn BlockSubscriptionStrategy> {
	let driver: Arc<dyn BlockStreamDriver> =
		match node.effective_strategy(client.supports_push()) {
			BlockStrategyType::Poll => Arc::new(PollingDriver),
			BlockStrategyType::Push => Arc::new(PushDriver),
		};
	if driver.kind() != node.block_strategy {
		info!(
			node = %node.name,
			"Node configured for {:?} delivery will poll", node.block_strategy
		);
	}
	let core = StrategyCore::new(node.clone(), client, cache, storage);
	Arc::new(BlockSubscription::new(core, driver))
}
