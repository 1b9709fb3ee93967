//! Start block resolution and checkpointing of block subscriptions.

use std::{sync::Arc, time::Duration};

use crate::integration::{
	common::{fast_node, wait_until},
	mocks::{MockBlockStorage, MockNodeClient, ScriptedChain},
};
use chain_event_relay::{
	models::BlockStrategyType,
	services::blockwatcher::{create_block_strategy, BlockCache},
	utils::tests::builders::{block::BlockBuilder, node::NodeBuilder},
};

fn storage_with_checkpoint(checkpoint: Option<u64>) -> MockBlockStorage {
	let mut storage = MockBlockStorage::new();
	storage
		.expect_get_last_processed_block()
		.returning(move |_| Ok(checkpoint));
	storage
}

fn idle_client() -> MockNodeClient {
	let mut client = MockNodeClient::new();
	client.expect_node_name().return_const("mainnet".to_string());
	client
}

#[tokio::test]
async fn test_start_block_is_the_later_of_configured_and_checkpoint() {
	let cases = [(10, Some(42), 42), (50, Some(42), 50), (7, None, 7)];

	for (configured, checkpoint, expected) in cases {
		let node = NodeBuilder::new().start_block(configured).build();
		let strategy = create_block_strategy(
			&node,
			Arc::new(idle_client()),
			Arc::new(BlockCache::new(4)),
			Arc::new(storage_with_checkpoint(checkpoint)),
		);
		assert_eq!(strategy.start_block().await.unwrap(), expected);
	}
}

#[tokio::test]
async fn test_fresh_node_starts_at_head() {
	let node = NodeBuilder::new().build();
	let mut client = idle_client();
	client
		.expect_get_latest_block_number()
		.times(1)
		.returning(|| Ok(77));

	let strategy = create_block_strategy(
		&node,
		Arc::new(client),
		Arc::new(BlockCache::new(4)),
		Arc::new(storage_with_checkpoint(None)),
	);
	assert_eq!(strategy.start_block().await.unwrap(), 77);
}

#[tokio::test]
async fn test_push_configured_client_without_push_polls() {
	let node = NodeBuilder::new()
		.block_strategy(BlockStrategyType::Push)
		.build();
	let strategy = create_block_strategy(
		&node,
		Arc::new(idle_client()),
		Arc::new(BlockCache::new(4)),
		Arc::new(storage_with_checkpoint(None)),
	);
	assert_eq!(strategy.kind(), BlockStrategyType::Poll);
}

#[tokio::test]
async fn test_checkpoint_follows_every_delivered_block() {
	let node = fast_node("mainnet", 1);
	let chain = Arc::new(ScriptedChain::new("mainnet"));
	for number in 1..=3u64 {
		chain.push_block(BlockBuilder::new().node("mainnet").number(number).build());
	}

	let mut storage = storage_with_checkpoint(None);
	let mut sequence = mockall::Sequence::new();
	for expected in 1..=3u64 {
		storage
			.expect_save_last_processed_block()
			.withf(move |node_name, block| node_name == "mainnet" && *block == expected)
			.times(1)
			.in_sequence(&mut sequence)
			.returning(|_, _| Ok(()));
	}

	let strategy = create_block_strategy(
		&node,
		chain.clone(),
		Arc::new(BlockCache::new(4)),
		Arc::new(storage),
	);
	let handle = strategy.subscribe().await.unwrap();
	assert_eq!(handle.start_block(), 1);

	assert!(
		wait_until(Duration::from_secs(5), || async {
			strategy.start_block().await.ok() == Some(3)
		})
		.await
	);
	// The checkpoint is written right after the cache is updated
	tokio::time::sleep(Duration::from_millis(50)).await;
	strategy.unsubscribe().await;
	assert!(!strategy.is_subscribed().await);
}
