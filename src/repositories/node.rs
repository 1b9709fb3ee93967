//! Node configuration repository implementation.

use std::{collections::HashMap, path::Path};

use crate::{
	models::{ConfigLoader, Node},
	repositories::error::RepositoryError,
};

/// Repository for configured nodes, keyed by node name
#[derive(Clone)]
pub struct NodeRepository {
	pub nodes: HashMap<String, Node>,
}

impl NodeRepository {
	/// Loads every node file of the directory (or `config/nodes` when None)
	pub fn new(path: Option<&Path>) -> Result<Self, RepositoryError> {
		let nodes = Self::load_nodes(path)?;
		Ok(NodeRepository { nodes })
	}

	pub fn new_with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
		NodeRepository {
			nodes: nodes
				.into_iter()
				.map(|node| (node.name.clone(), node))
				.collect(),
		}
	}

	// Files are keyed by stem, the registry by node name; the name wins.
	fn load_nodes(path: Option<&Path>) -> Result<HashMap<String, Node>, RepositoryError> {
		let by_file: HashMap<String, Node> = Node::load_all(path)
			.map_err(|e| RepositoryError::load_error(format!("Failed to load nodes: {}", e)))?;

		let mut nodes = HashMap::new();
		for (_, node) in by_file {
			if nodes.contains_key(&node.name) {
				return Err(RepositoryError::validation_error(format!(
					"Node '{}' is configured more than once",
					node.name
				)));
			}
			nodes.insert(node.name.clone(), node);
		}
		Ok(nodes)
	}
}

/// Interface for node repository implementations
pub trait NodeRepositoryTrait: Clone {
	fn load_all(&self, path: Option<&Path>) -> Result<HashMap<String, Node>, RepositoryError>;
	fn get(&self, node_name: &str) -> Option<Node>;
	fn get_all(&self) -> HashMap<String, Node>;
}

impl NodeRepositoryTrait for NodeRepository {
	fn load_all(&self, path: Option<&Path>) -> Result<HashMap<String, Node>, RepositoryError> {
		Self::load_nodes(path)
	}

	fn get(&self, node_name: &str) -> Option<Node> {
		self.nodes.get(node_name).cloned()
	}

	fn get_all(&self) -> HashMap<String, Node> {
		self.nodes.clone()
	}
}

/// Service layer for node repository operations
#[derive(Clone)]
pub struct NodeService<T: NodeRepositoryTrait> {
	repository: T,
}

impl<T: NodeRepositoryTrait> NodeService<T> {
	pub fn new(path: Option<&Path>) -> Result<NodeService<NodeRepository>, RepositoryError> {
		let repository = NodeRepository::new(path)?;
		Ok(NodeService { repository })
	}

	pub fn new_with_repository(repository: T) -> Result<Self, RepositoryError> {
		Ok(NodeService { repository })
	}

	pub fn get(&self, node_name: &str) -> Option<Node> {
		self.repository.get(node_name)
	}

	pub fn get_all(&self) -> HashMap<String, Node> {
		self.repository.get_all()
	}
}
