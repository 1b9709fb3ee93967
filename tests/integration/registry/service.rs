//! Registry behavior as seen through its store and cluster seams.

use std::{collections::HashMap, sync::Arc};

use crate::integration::mocks::{MockClusterBus, MockSubscriptionStore};
use chain_event_relay::{
	models::{ClusterConfig, ClusterControlMessage, Node, TransactionIdentifierType},
	services::{
		cluster::{ClusterError, ClusterMessageHandler, ClusterPublisher},
		registry::SubscriptionRegistry,
	},
	utils::tests::builders::{filter::FilterBuilder, monitor::MonitorBuilder, node::NodeBuilder},
};

fn nodes() -> HashMap<String, Node> {
	HashMap::from([("mainnet".to_string(), NodeBuilder::new().name("mainnet").build())])
}

fn fast_cluster(retry_attempts: usize) -> ClusterConfig {
	ClusterConfig {
		retry_attempts,
		initial_backoff_ms: 1,
		max_backoff_ms: 2,
		partition_count: 3,
	}
}

#[tokio::test]
async fn test_local_registration_persists_and_publishes_once() {
	let mut store = MockSubscriptionStore::new();
	store.expect_save_filter().times(1).returning(|_| Ok(()));

	let mut bus = MockClusterBus::new();
	bus.expect_publish()
		.withf(|envelope| {
			envelope.origin == "relay-a"
				&& matches!(&envelope.message, ClusterControlMessage::FilterAdded(f) if f.id == "transfers")
		})
		.times(1)
		.returning(|_| Ok(()));

	let registry = SubscriptionRegistry::new(nodes())
		.with_store(Arc::new(store))
		.with_cluster(ClusterPublisher::new(Arc::new(bus), "relay-a", fast_cluster(0)));

	let filter = FilterBuilder::new().id("transfers").build();
	registry.register_filter(filter.clone(), true).await.unwrap();

	// A peer replaying the same filter must not persist or publish it again
	registry
		.handle(ClusterControlMessage::FilterAdded(filter))
		.await
		.unwrap();

	assert_eq!(registry.filter_count().await, 1);
}

#[tokio::test]
async fn test_unregistering_unknown_filter_succeeds() {
	let mut store = MockSubscriptionStore::new();
	store
		.expect_delete_filter()
		.withf(|filter_id| filter_id == "missing")
		.times(1)
		.returning(|_| Ok(()));

	let mut bus = MockClusterBus::new();
	bus.expect_publish()
		.withf(|envelope| {
			matches!(
				&envelope.message,
				ClusterControlMessage::FilterRemoved { filter_id } if filter_id == "missing"
			)
		})
		.times(1)
		.returning(|_| Ok(()));

	let registry = SubscriptionRegistry::new(nodes())
		.with_store(Arc::new(store))
		.with_cluster(ClusterPublisher::new(Arc::new(bus), "relay-a", fast_cluster(0)));

	assert!(!registry.unregister_filter("missing", false).await.unwrap());
	assert!(!registry.unregister_filter("missing", true).await.unwrap());
	assert!(!registry
		.unregister_transaction_monitor("missing", false)
		.await
		.unwrap());
}

#[tokio::test]
async fn test_concurrent_registrations_of_one_id_keep_one_entry() {
	let mut store = MockSubscriptionStore::new();
	store.expect_save_filter().times(1).returning(|_| Ok(()));
	let registry = Arc::new(SubscriptionRegistry::new(nodes()).with_store(Arc::new(store)));

	let tasks = (0..16)
		.map(|_| {
			let registry = registry.clone();
			tokio::spawn(async move {
				registry
					.register_filter(FilterBuilder::new().id("transfers").build(), true)
					.await
			})
		})
		.collect::<Vec<_>>();
	for task in tasks {
		assert_eq!(task.await.unwrap().unwrap(), "transfers");
	}

	assert_eq!(registry.filter_count().await, 1);
	assert_eq!(registry.filters_for_node("mainnet").await.len(), 1);
}

#[tokio::test]
async fn test_failed_cluster_publish_keeps_local_registration() {
	let mut bus = MockClusterBus::new();
	bus.expect_publish()
		.times(3)
		.returning(|_| Err(ClusterError::publish_error("broker down")));

	let registry = SubscriptionRegistry::new(nodes())
		.with_cluster(ClusterPublisher::new(Arc::new(bus), "relay-a", fast_cluster(2)));

	let spec_id = registry
		.register_transaction_monitor(MonitorBuilder::new().build(), true)
		.await
		.unwrap();
	assert!(registry.monitor(&spec_id).await.is_some());
}

#[tokio::test]
async fn test_store_failure_rejects_local_registration() {
	let mut store = MockSubscriptionStore::new();
	store.expect_save_monitor().times(1).returning(|_| {
		Err(chain_event_relay::repositories::RepositoryError::store_error(
			"disk full",
		))
	});
	let registry = SubscriptionRegistry::new(nodes()).with_store(Arc::new(store));

	assert!(registry
		.register_transaction_monitor(MonitorBuilder::new().build(), true)
		.await
		.is_err());
	assert_eq!(registry.monitor_count().await, 0);
}

#[tokio::test]
async fn test_peer_messages_this_instance_cannot_apply_are_ignored() {
	let registry = SubscriptionRegistry::new(nodes());

	let foreign_node = MonitorBuilder::new().node("testnet").build();
	registry
		.handle(ClusterControlMessage::MonitorAdded(foreign_node))
		.await
		.unwrap();

	let unsupported = MonitorBuilder::new()
		.type_(TransactionIdentifierType::Unsupported)
		.value("whatever")
		.build();
	registry
		.handle(ClusterControlMessage::MonitorAdded(unsupported))
		.await
		.unwrap();

	assert_eq!(registry.monitor_count().await, 0);
}
