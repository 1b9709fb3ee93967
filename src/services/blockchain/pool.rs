//! Client pool for node clients.
//!
//! Caches one client per node name and creates clients lazily on first use. The pool uses a
//! fast path for existing clients and a slow path for creating new ones.

use futures::future::BoxFuture;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

use crate::{
	models::Node,
	services::blockchain::{BlockChainError, JsonRpcNodeClient, NodeClient},
	utils::HttpRetryConfig,
};

/// Function creating a client for a node
pub type ClientFactory = Arc<
	dyn Fn(&Node) -> BoxFuture<'static, Result<Arc<dyn NodeClient>, BlockChainError>>
		+ Send
		+ Sync,
>;

/// Caches node clients by node name
pub struct ClientPool {
	clients: RwLock<HashMap<String, Arc<dyn NodeClient>>>,
	factory: ClientFactory,
}

impl ClientPool {
	/// Creates a pool building [`JsonRpcNodeClient`]s
	pub fn new() -> Self {
		Self::with_factory(Arc::new(
			|node: &Node| -> BoxFuture<'static, Result<Arc<dyn NodeClient>, BlockChainError>> {
				let node = node.clone();
				Box::pin(async move {
					let client = JsonRpcNodeClient::new(&node, HttpRetryConfig::default())?;
					Ok(Arc::new(client) as Arc<dyn NodeClient>)
				})
			},
		))
	}

	/// Creates a pool using a custom client factory
	pub fn with_factory(factory: ClientFactory) -> Self {
		Self {
			clients: RwLock::new(HashMap::new()),
			factory,
		}
	}

	/// Gets or creates the client for a node.
	///
	/// Uses a double-checked locking pattern: a read lock for the common case, then a write
	/// lock that re-checks before creating the client.
	pub async fn get_client(&self, node: &Node) -> Result<Arc<dyn NodeClient>, BlockChainError> {
		if let Some(client) = self.clients.read().await.get(&node.name) {
			return Ok(client.clone());
		}

		let mut clients = self.clients.write().await;
		if let Some(client) = clients.get(&node.name) {
			return Ok(client.clone());
		}
		let client = (self.factory)(node).await?;
		clients.insert(node.name.clone(), client.clone());
		Ok(client)
	}

	/// Client for a node that was already created
	pub async fn cached_client(&self, node_name: &str) -> Option<Arc<dyn NodeClient>> {
		self.clients.read().await.get(node_name).cloned()
	}

	/// Number of cached clients
	pub async fn client_count(&self) -> usize {
		self.clients.read().await.len()
	}
}

impl Default for ClientPool {
	fn default() -> Self {
		Self::new()
	}
}
