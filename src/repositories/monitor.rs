//! Transaction monitoring spec configuration repository implementation.
//!
//! Specs are keyed by their deterministic id, so two files describing the same spec
//! collapse into one entry.

use std::{collections::HashMap, marker::PhantomData, path::Path};

use crate::{
	models::{ConfigLoader, Node, TransactionMonitoringSpec},
	repositories::{
		error::RepositoryError,
		node::{NodeRepository, NodeRepositoryTrait, NodeService},
	},
};

/// Repository for configured monitoring specs, keyed by spec id
#[derive(Clone)]
pub struct MonitorRepository<N: NodeRepositoryTrait> {
	pub monitors: HashMap<String, TransactionMonitoringSpec>,
	_node_repository: PhantomData<N>,
}

impl<N: NodeRepositoryTrait> MonitorRepository<N> {
	/// Loads every spec file of the directory (or `config/monitors` when None)
	pub fn new(
		path: Option<&Path>,
		node_service: Option<NodeService<N>>,
	) -> Result<Self, RepositoryError> {
		let monitors = Self::load_monitors(path, node_service)?;
		Ok(MonitorRepository {
			monitors,
			_node_repository: PhantomData,
		})
	}

	pub fn new_with_monitors(monitors: impl IntoIterator<Item = TransactionMonitoringSpec>) -> Self {
		MonitorRepository {
			monitors: monitors
				.into_iter()
				.map(|spec| (spec.id.clone(), spec))
				.collect(),
			_node_repository: PhantomData,
		}
	}

	/// Returns an error if any spec references a node that is not configured
	pub fn validate_monitor_references(
		monitors: &HashMap<String, TransactionMonitoringSpec>,
		nodes: &HashMap<String, Node>,
	) -> Result<(), RepositoryError> {
		let validation_errors: Vec<String> = monitors
			.values()
			.filter(|spec| !nodes.contains_key(&spec.node_name))
			.map(|spec| {
				format!(
					"Monitor '{}' references non-existent node '{}'",
					spec.id, spec.node_name
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

	fn load_monitors(
		path: Option<&Path>,
		node_service: Option<NodeService<N>>,
	) -> Result<HashMap<String, TransactionMonitoringSpec>, RepositoryError> {
		let by_file: HashMap<String, TransactionMonitoringSpec> =
			TransactionMonitoringSpec::load_all(path).map_err(|e| {
				RepositoryError::load_error(format!("Failed to load monitors: {}", e))
			})?;
		let monitors: HashMap<String, TransactionMonitoringSpec> = by_file
			.into_values()
			.map(|spec| (spec.id.clone(), spec))
			.collect();

		let nodes = match node_service {
			Some(service) => service.get_all(),
			None => NodeRepository::new(None)?.nodes,
		};
		Self::validate_monitor_references(&monitors, &nodes)?;
		Ok(monitors)
	}
}

/// Interface for monitor repository implementations
pub trait MonitorRepositoryTrait<N: NodeRepositoryTrait>: Clone {
	fn get(&self, spec_id: &str) -> Option<TransactionMonitoringSpec>;
	fn get_all(&self) -> HashMap<String, TransactionMonitoringSpec>;
}

impl<N: NodeRepositoryTrait> MonitorRepositoryTrait<N> for MonitorRepository<N> {
	fn get(&self, spec_id: &str) -> Option<TransactionMonitoringSpec> {
		self.monitors.get(spec_id).cloned()
	}

	fn get_all(&self) -> HashMap<String, TransactionMonitoringSpec> {
		self.monitors.clone()
	}
}

/// Service layer for monitor repository operations
#[derive(Clone)]
pub struct MonitorService<N: NodeRepositoryTrait, T: MonitorRepositoryTrait<N>> {
	repository: T,
	_node_repository: PhantomData<N>,
}

impl<N: NodeRepositoryTrait, T: MonitorRepositoryTrait<N>> MonitorService<N, T> {
	pub fn new_with_repository(repository: T) -> Result<Self, RepositoryError> {
		Ok(MonitorService {
			repository,
			_node_repository: PhantomData,
		})
	}

	pub fn get(&self, spec_id: &str) -> Option<TransactionMonitoringSpec> {
		self.repository.get(spec_id)
	}

	pub fn get_all(&self) -> HashMap<String, TransactionMonitoringSpec> {
		self.repository.get_all()
	}
}
