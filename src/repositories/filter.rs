//! Contract event filter configuration repository implementation.
//!
//! Loads statically configured filters from JSON files and checks that every filter refers
//! to a configured node.

use std::{collections::HashMap, marker::PhantomData, path::Path};

use crate::{
	models::{ConfigLoader, ContractEventFilter, Node},
	repositories::{
		error::RepositoryError,
		node::{NodeRepository, NodeRepositoryTrait, NodeService},
	},
};

/// Repository for configured contract event filters, keyed by filter id
#[derive(Clone)]
pub struct FilterRepository<N: NodeRepositoryTrait> {
	pub filters: HashMap<String, ContractEventFilter>,
	_node_repository: PhantomData<N>,
}

impl<N: NodeRepositoryTrait> FilterRepository<N> {
	/// Loads every filter file of the directory (or `config/filters` when None)
	pub fn new(
		path: Option<&Path>,
		node_service: Option<NodeService<N>>,
	) -> Result<Self, RepositoryError> {
		let filters = Self::load_filters(path, node_service)?;
		Ok(FilterRepository {
			filters,
			_node_repository: PhantomData,
		})
	}

	pub fn new_with_filters(filters: impl IntoIterator<Item = ContractEventFilter>) -> Self {
		FilterRepository {
			filters: filters
				.into_iter()
				.map(|filter| (filter.id.clone(), filter))
				.collect(),
			_node_repository: PhantomData,
		}
	}

	/// Returns an error if any filter references a node that is not configured
	pub fn validate_filter_references(
		filters: &HashMap<String, ContractEventFilter>,
		nodes: &HashMap<String, Node>,
	) -> Result<(), RepositoryError> {
		let validation_errors: Vec<String> = filters
			.values()
			.filter(|filter| !nodes.contains_key(&filter.node_name))
			.map(|filter| {
				format!(
					"Filter '{}' references non-existent node '{}'",
					filter.id, filter.node_name
				)
			})
			.collect();

		if !validation_errors.is_empty() {
			return Err(RepositoryError::validation_error(format!(
				"Configuration validation failed:\n{}",
				validation_errors.join("\n")
			)));
		}

		Ok(())
	}

	fn load_filters(
		path: Option<&Path>,
		node_service: Option<NodeService<N>>,
	) -> Result<HashMap<String, ContractEventFilter>, RepositoryError> {
		let by_file: HashMap<String, ContractEventFilter> = ContractEventFilter::load_all(path)
			.map_err(|e| RepositoryError::load_error(format!("Failed to load filters: {}", e)))?;

		let mut filters = HashMap::new();
		for (file, filter) in by_file {
			if filters.insert(filter.id.clone(), filter).is_some() {
				return Err(RepositoryError::validation_error(format!(
					"Filter id from '{}' is configured more than once",
					file
				)));
			}
		}

		let nodes = match node_service {
			Some(service) => service.get_all(),
			None => NodeRepository::new(None)?.nodes,
		};
		Self::validate_filter_references(&filters, &nodes)?;
		Ok(filters)
	}
}

/// Interface for filter repository implementations
pub trait FilterRepositoryTrait<N: NodeRepositoryTrait>: Clone {
	fn get(&self, filter_id: &str) -> Option<ContractEventFilter>;
	fn get_all(&self) -> HashMap<String, ContractEventFilter>;
}

impl<N: NodeRepositoryTrait> FilterRepositoryTrait<N> for FilterRepository<N> {
	fn get(&self, filter_id: &str) -> Option<ContractEventFilter> {
		self.filters.get(filter_id).cloned()
	}

	fn get_all(&self) -> HashMap<String, ContractEventFilter> {
		self.filters.clone()
	}
}

/// Service layer for filter repository operations
#[derive(Clone)]
pub struct FilterService<N: NodeRepositoryTrait, T: FilterRepositoryTrait<N>> {
	repository: T,
	_node_repository: PhantomData<N>,
}

impl<N: NodeRepositoryTrait, T: FilterRepositoryTrait<N>> FilterService<N, T> {
	pub fn new_with_repository(repository: T) -> Result<Self, RepositoryError> {
		Ok(FilterService {
			repository,
			_node_repository: PhantomData,
		})
	}

	pub fn get(&self, filter_id: &str) -> Option<ContractEventFilter> {
		self.repository.get(filter_id)
	}

	pub fn get_all(&self) -> HashMap<String, ContractEventFilter> {
		self.repository.get_all()
	}
}
