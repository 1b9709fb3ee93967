//! Mock implementations of the relay's service seams.

use async_trait::async_trait;
use mockall::mock;

use chain_event_relay::{
	models::{ClusterEnvelope, ContractEventFilter, MessageEnvelope, TransactionMonitoringSpec},
	repositories::{RepositoryError, SubscriptionStore, WritableSubscriptionStore},
	services::{
		blockwatcher::{BlockStorage, BlockWatcherError},
		broadcast::{BroadcastError, BroadcastSink},
		cluster::{ClusterBus, ClusterError, ClusterSubscription},
	},
};

mock! {
	pub BroadcastSink {}

	#[async_trait]
	impl BroadcastSink for BroadcastSink {
		async fn publish(
			&self,
			destination: &str,
			key: &str,
			envelope: &MessageEnvelope,
		) -> Result<(), BroadcastError>;
	}
}

mock! {
	pub ClusterBus {}

	#[async_trait]
	impl ClusterBus for ClusterBus {
		async fn publish(&self, envelope: ClusterEnvelope) -> Result<(), ClusterError>;
		async fn subscribe(&self) -> Result<ClusterSubscription, ClusterError>;
	}
}

mock! {
	pub BlockStorage {}

	#[async_trait]
	impl BlockStorage for BlockStorage {
		async fn get_last_processed_block(&self, node_name: &str) -> Result<Option<u64>, BlockWatcherError>;
		async fn save_last_processed_block(&self, node_name: &str, block: u64) -> Result<(), BlockWatcherError>;
		async fn delete_checkpoint(&self, node_name: &str) -> Result<(), BlockWatcherError>;
	}
}

mock! {
	pub SubscriptionStore {}

	#[async_trait]
	impl SubscriptionStore for SubscriptionStore {
		async fn load_filters(&self) -> Result<Vec<ContractEventFilter>, RepositoryError>;
		async fn load_monitors(&self) -> Result<Vec<TransactionMonitoringSpec>, RepositoryError>;
	}

	#[async_trait]
	impl WritableSubscriptionStore for SubscriptionStore {
		async fn save_filter(&self, filter: &ContractEventFilter) -> Result<(), RepositoryError>;
		async fn delete_filter(&self, filter_id: &str) -> Result<(), RepositoryError>;
		async fn save_monitor(&self, spec: &TransactionMonitoringSpec) -> Result<(), RepositoryError>;
		async fn delete_monitor(&self, spec_id: &str) -> Result<(), RepositoryError>;
	}
}
