//! Ordering of matching work on the per-node dispatch queues.

use alloy::primitives::B256;
use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tempfile::tempdir;
use tokio::sync::{watch, Mutex};

use crate::integration::{
	common::{fast_node, registry_for, strategy_for, wait_until},
	mocks::ScriptedChain,
};
use chain_event_relay::{
	models::{TransactionIdentifierType, TransactionMatch},
	services::{
		dispatch::DispatchQueues,
		filter::{MatchingEngine, TransactionListener},
	},
	utils::tests::builders::{
		block::BlockBuilder, log::LogBuilder, monitor::MonitorBuilder,
		transaction::TransactionBuilder,
	},
};

#[derive(Default)]
struct BlockRecorder {
	blocks: Mutex<Vec<u64>>,
}

#[async_trait]
impl TransactionListener for BlockRecorder {
	async fn on_transaction(&self, matched: &TransactionMatch) {
		self.blocks
			.lock()
			.await
			.push(matched.transaction.block_number);
	}
}

#[tokio::test]
async fn test_tasks_of_one_node_run_in_enqueue_order() {
	let (_shutdown, shutdown_rx) = watch::channel(false);
	let queues = DispatchQueues::new(shutdown_rx);
	let seen = Arc::new(Mutex::new(Vec::new()));

	for number in 1..=30u64 {
		let seen = seen.clone();
		// Earlier blocks take longer, so any parallelism would reorder them
		let delay = Duration::from_millis((31 - number) % 7);
		queues
			.enqueue(
				"mainnet",
				number,
				"record",
				Box::pin(async move {
					tokio::time::sleep(delay).await;
					seen.lock().await.push(number);
				}),
			)
			.await
			.unwrap();
	}

	assert!(wait_until(Duration::from_secs(5), || async { seen.lock().await.len() == 30 }).await);
	let seen = seen.lock().await.clone();
	assert_eq!(seen, (1..=30).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_polled_blocks_are_matched_in_block_order() {
	let dir = tempdir().unwrap();
	let node = fast_node("mainnet", 1);
	let chain = Arc::new(ScriptedChain::new("mainnet"));
	let topic = B256::repeat_byte(0x77);

	for number in 1..=12u64 {
		chain.push_block(
			BlockBuilder::new()
				.node("mainnet")
				.number(number)
				.transaction(
					TransactionBuilder::new()
						.hash(B256::with_last_byte(number as u8))
						.log(LogBuilder::new().topic(topic).build())
						.build(),
				)
				.build(),
		);
	}

	let registry = registry_for(&[&node]);
	registry
		.register_transaction_monitor(
			MonitorBuilder::new()
				.type_(TransactionIdentifierType::Topic)
				.value(&topic.to_string())
				.build(),
			false,
		)
		.await
		.unwrap();

	let recorder = Arc::new(BlockRecorder::default());
	let (shutdown, shutdown_rx) = watch::channel(false);
	let queues = Arc::new(DispatchQueues::new(shutdown_rx));
	let engine = Arc::new(
		MatchingEngine::new(chain.clone(), registry).with_transaction_listener(recorder.clone()),
	);

	let strategy = strategy_for(&node, chain.clone(), dir.path());
	strategy
		.add_block_listener(engine.into_block_listener(queues.clone()))
		.await;
	strategy.subscribe().await.unwrap();

	assert!(
		wait_until(Duration::from_secs(5), || async {
			recorder.blocks.lock().await.len() == 12
		})
		.await
	);
	strategy.unsubscribe().await;
	let _ = shutdown.send(true);

	let blocks = recorder.blocks.lock().await.clone();
	assert!(blocks.windows(2).all(|pair| pair[0] <= pair[1]));
	assert_eq!(blocks.first(), Some(&1));
	assert_eq!(blocks.last(), Some(&12));
}
