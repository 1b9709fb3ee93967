//! End-to-end runs of a relay started from its configuration.

use alloy::primitives::{Address, B256};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tempfile::{tempdir, TempDir};
use tokio::sync::broadcast::Receiver;

use crate::integration::{
	common::{fast_node, pool_serving, wait_until},
	mocks::ScriptedChain,
};
use chain_event_relay::{
	bootstrap::{Relay, RelayConfiguration},
	models::{
		ContractEventFilter, CorrelationIdStrategy, MessageType, RelayConfig, ReconnectConfig,
	},
	services::broadcast::{ChannelSink, PublishedEnvelope},
	utils::tests::builders::{
		block::BlockBuilder, filter::FilterBuilder, log::LogBuilder,
		transaction::TransactionBuilder,
	},
};

/// Chain with blocks 100 to 105 where only block 103 emits a transfer to `holder`
fn chain_with_transfer(filter: &ContractEventFilter, holder: B256) -> Arc<ScriptedChain> {
	let chain = Arc::new(ScriptedChain::new("mainnet"));
	for number in 100..=105u64 {
		let mut builder = BlockBuilder::new().node("mainnet").number(number);
		if number == 103 {
			builder = builder.transaction(
				TransactionBuilder::new()
					.log(
						LogBuilder::new()
							.address(filter.contract_address.unwrap())
							.topic(filter.event_topic())
							.topic(holder)
							.build(),
					)
					.build(),
			);
		}
		let block = builder.build();
		for transaction in &block.transactions {
			for log in &transaction.logs {
				chain.add_log(log.clone());
			}
		}
		chain.push_block(block);
	}
	chain
}

fn configuration(storage: &TempDir, filters: Vec<ContractEventFilter>) -> RelayConfiguration {
	RelayConfiguration {
		relay: RelayConfig {
			instance_id: Some("relay-test".to_string()),
			storage_path: storage.path().to_path_buf(),
			reconnect: ReconnectConfig {
				initial_delay_ms: 1,
				max_delay_ms: 5,
				max_attempts: Some(3),
			},
			..RelayConfig::default()
		},
		nodes: HashMap::from([("mainnet".to_string(), fast_node("mainnet", 100))]),
		filters,
		monitors: vec![],
	}
}

async fn collect_until_blocks(
	receiver: &mut Receiver<PublishedEnvelope>,
	blocks: usize,
) -> Vec<PublishedEnvelope> {
	let mut published = Vec::new();
	let done = tokio::time::timeout(Duration::from_secs(5), async {
		while let Ok(envelope) = receiver.recv().await {
			published.push(envelope);
			let seen_blocks = published
				.iter()
				.filter(|p| p.envelope.type_ == MessageType::Block)
				.count();
			if seen_blocks >= blocks {
				break;
			}
		}
	})
	.await;
	assert!(done.is_ok(), "only {} envelopes were published", published.len());

	// Matching runs on the dispatch queue after the block broadcast
	tokio::time::sleep(Duration::from_millis(100)).await;
	while let Ok(envelope) = receiver.try_recv() {
		published.push(envelope);
	}
	published
}

fn of_type(published: &[PublishedEnvelope], type_: MessageType) -> Vec<&PublishedEnvelope> {
	published
		.iter()
		.filter(|p| p.envelope.type_ == type_)
		.collect()
}

#[tokio::test]
async fn test_single_matching_block_yields_one_keyed_event() {
	let storage = tempdir().unwrap();
	let holder = B256::left_padding_from(Address::repeat_byte(0x42).as_slice());
	let filter = FilterBuilder::new()
		.id("usdc")
		.correlation_id_strategy(CorrelationIdStrategy::IndexedParameter { parameter_index: 0 })
		.build();
	let chain = chain_with_transfer(&filter, holder);

	let sink = Arc::new(ChannelSink::new(256));
	let mut receiver = sink.subscribe();
	let relay = Relay::builder(configuration(&storage, vec![filter]))
		.with_clients(pool_serving(chain.clone()))
		.with_broadcast_sink(sink)
		.start()
		.await
		.unwrap();
	assert_eq!(relay.summary().filters, 1);

	let published = collect_until_blocks(&mut receiver, 6).await;
	let events = of_type(&published, MessageType::ContractEvent);
	assert_eq!(events.len(), 1);
	assert_eq!(events[0].destination, "contract-events");
	assert_eq!(events[0].key, format!("0x{}", hex::encode(holder)));
	assert_eq!(events[0].envelope.details["block_number"], 103);

	let blocks = of_type(&published, MessageType::Block);
	assert_eq!(blocks.len(), 6);

	relay.shutdown().await;
}

#[tokio::test]
async fn test_event_without_correlation_is_keyed_by_envelope_id() {
	let storage = tempdir().unwrap();
	let filter = FilterBuilder::new().id("plain").build();
	let chain = chain_with_transfer(&filter, B256::repeat_byte(0x01));

	let sink = Arc::new(ChannelSink::new(256));
	let mut receiver = sink.subscribe();
	let relay = Relay::builder(configuration(&storage, vec![filter]))
		.with_clients(pool_serving(chain))
		.with_broadcast_sink(sink)
		.start()
		.await
		.unwrap();

	let published = collect_until_blocks(&mut receiver, 6).await;
	let events = of_type(&published, MessageType::ContractEvent);
	assert_eq!(events.len(), 1);
	assert_eq!(events[0].key, events[0].envelope.id);

	relay.shutdown().await;
}

#[tokio::test]
async fn test_restart_restores_filters_and_resumes_at_checkpoint() {
	let storage = tempdir().unwrap();
	let filter = FilterBuilder::new().id("usdc").build();
	let chain = chain_with_transfer(&filter, B256::repeat_byte(0x01));

	let relay = Relay::builder(configuration(&storage, vec![filter]))
		.with_clients(pool_serving(chain.clone()))
		.start()
		.await
		.unwrap();
	let strategy = relay.strategy("mainnet").unwrap().clone();
	assert!(
		wait_until(Duration::from_secs(5), || async {
			strategy.start_block().await.ok() == Some(105)
		})
		.await
	);
	tokio::time::sleep(Duration::from_millis(50)).await;
	relay.shutdown().await;

	// Nothing configured this time: the filter comes back from the store
	let restarted = Relay::builder(configuration(&storage, vec![]))
		.with_clients(pool_serving(chain.clone()))
		.start()
		.await
		.unwrap();
	assert!(restarted.registry().filter("usdc").await.is_some());
	let strategy = restarted.strategy("mainnet").unwrap();
	assert_eq!(strategy.start_block().await.unwrap(), 105);

	restarted.shutdown().await;
}
