//! Helpers shared by the integration tests.

use futures::future::BoxFuture;
use std::{collections::HashMap, future::Future, path::Path, sync::Arc, time::Duration};

use chain_event_relay::{
	models::Node,
	services::{
		blockchain::{BlockChainError, ClientPool, NodeClient},
		blockwatcher::{create_block_strategy, BlockCache, BlockSubscriptionStrategy, FileBlockStorage},
		registry::SubscriptionRegistry,
	},
	utils::tests::builders::node::NodeBuilder,
};

/// Polls `condition` every few milliseconds until it holds or `timeout` passes
pub async fn wait_until<F, Fut>(timeout: Duration, mut condition: F) -> bool
where
	F: FnMut() -> Fut,
	Fut: Future<Output = bool>,
{
	let deadline = tokio::time::Instant::now() + timeout;
	loop {
		if condition().await {
			return true;
		}
		if tokio::time::Instant::now() >= deadline {
			return false;
		}
		tokio::time::sleep(Duration::from_millis(5)).await;
	}
}

/// Polling node with intervals short enough for tests
pub fn fast_node(name: &str, start_block: u64) -> Node {
	NodeBuilder::new()
		.name(name)
		.polling_interval_ms(10)
		.health_check_interval_ms(20)
		.start_block(start_block)
		.build()
}

/// Registry accepting subscriptions for the given nodes
pub fn registry_for(nodes: &[&Node]) -> Arc<SubscriptionRegistry> {
	let nodes: HashMap<String, Node> = nodes
		.iter()
		.map(|node| (node.name.clone(), (*node).clone()))
		.collect();
	Arc::new(SubscriptionRegistry::new(nodes))
}

/// Polling strategy with checkpoints stored under `storage_dir`
pub fn strategy_for(
	node: &Node,
	client: Arc<dyn NodeClient>,
	storage_dir: &Path,
) -> Arc<dyn BlockSubscriptionStrategy> {
	create_block_strategy(
		node,
		client,
		Arc::new(BlockCache::new(16)),
		Arc::new(FileBlockStorage::new(storage_dir)),
	)
}

/// Client pool handing out `client` for every node
pub fn pool_serving(client: Arc<dyn NodeClient>) -> Arc<ClientPool> {
	Arc::new(ClientPool::with_factory(Arc::new(
		move |_node: &Node| -> BoxFuture<'static, Result<Arc<dyn NodeClient>, BlockChainError>> {
			let client = client.clone();
			Box::pin(async move { Ok(client) })
		},
	)))
}
