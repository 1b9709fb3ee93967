//! Matching engine behavior against mocked and scripted nodes.

use alloy::primitives::{Address, B256};
use std::{str::FromStr, sync::Arc};
use tokio::sync::broadcast::Receiver;

use crate::integration::{
	common::registry_for,
	mocks::{MockNodeClient, ScriptedChain},
};
use chain_event_relay::{
	models::{
		DestinationConfig, MessageType, TransactionIdentifierType, TransactionReceipt,
		TransactionStatus,
	},
	services::{
		broadcast::{ChannelSink, EventBroadcaster, PublishedEnvelope},
		filter::{MatchingEngine, ReceiptStatusExtension},
		registry::SubscriptionRegistry,
	},
	utils::tests::builders::{
		block::BlockBuilder, filter::FilterBuilder, log::LogBuilder, monitor::MonitorBuilder,
		node::NodeBuilder, transaction::TransactionBuilder,
	},
};

fn broadcaster() -> (Arc<EventBroadcaster>, Receiver<PublishedEnvelope>) {
	let sink = Arc::new(ChannelSink::new(64));
	let receiver = sink.subscribe();
	(
		Arc::new(EventBroadcaster::new(sink, DestinationConfig::default())),
		receiver,
	)
}

fn drain(receiver: &mut Receiver<PublishedEnvelope>, type_: MessageType) -> Vec<PublishedEnvelope> {
	let mut published = Vec::new();
	while let Ok(envelope) = receiver.try_recv() {
		if envelope.envelope.type_ == type_ {
			published.push(envelope);
		}
	}
	published
}

fn mainnet_client() -> MockNodeClient {
	let mut client = MockNodeClient::new();
	client.expect_node_name().return_const("mainnet".to_string());
	client
}

#[tokio::test]
async fn test_bloom_negative_skips_log_fetch() {
	let node = NodeBuilder::new().build();
	let registry = registry_for(&[&node]);
	let filter = FilterBuilder::new().build();
	registry.register_filter(filter.clone(), false).await.unwrap();

	let mut client = mainnet_client();
	client.expect_get_logs().times(0);
	let engine = MatchingEngine::new(Arc::new(client), registry);

	let block = BlockBuilder::new().number(1).build();
	assert!(engine.contract_event_pass(&block).await.is_empty());
}

#[tokio::test]
async fn test_bloom_positive_always_fetches_logs() {
	let node = NodeBuilder::new().build();
	let registry = registry_for(&[&node]);
	let filter = FilterBuilder::new().build();
	let address = filter.contract_address.unwrap();
	registry.register_filter(filter.clone(), false).await.unwrap();

	let mut client = mainnet_client();
	// A false positive: the bloom says maybe, the node returns nothing
	client
		.expect_get_logs()
		.withf(|query| query.from_block == 2 && query.to_block == 2)
		.times(1)
		.returning(|_| Ok(vec![]));
	let engine = MatchingEngine::new(Arc::new(client), registry);

	let block = BlockBuilder::new()
		.number(2)
		.bloom_entry(filter.event_topic().as_slice())
		.bloom_entry(address.as_slice())
		.build();
	assert!(engine.contract_event_pass(&block).await.is_empty());
}

#[tokio::test]
async fn test_filter_without_address_fetches_on_topic_alone() {
	let node = NodeBuilder::new().build();
	let registry = registry_for(&[&node]);
	let filter = FilterBuilder::new().any_contract().build();
	registry.register_filter(filter.clone(), false).await.unwrap();

	let topic = filter.event_topic();
	let mut client = mainnet_client();
	client
		.expect_get_logs()
		.withf(|query| query.address.is_none())
		.times(1)
		.returning(move |_| {
			Ok(vec![
				LogBuilder::new()
					.address(Address::repeat_byte(0x11))
					.topic(topic)
					.block(3, B256::repeat_byte(3))
					.build(),
				LogBuilder::new()
					.address(Address::repeat_byte(0x22))
					.topic(B256::repeat_byte(0x99))
					.block(3, B256::repeat_byte(3))
					.log_index(1)
					.build(),
			])
		});
	let engine = MatchingEngine::new(Arc::new(client), registry);

	let block = BlockBuilder::new()
		.number(3)
		.bloom_entry(topic.as_slice())
		.build();
	let events = engine.contract_event_pass(&block).await;
	assert_eq!(events.len(), 1);
	assert_eq!(events[0].address, Address::repeat_byte(0x11));
	assert_eq!(events[0].name, "Transfer");
}

#[tokio::test]
async fn test_topic_monitor_survives_repeated_matches() {
	let node = NodeBuilder::new().build();
	let registry = registry_for(&[&node]);
	let topic = B256::repeat_byte(0x55);
	let spec_id = registry
		.register_transaction_monitor(
			MonitorBuilder::new()
				.type_(TransactionIdentifierType::Topic)
				.value(&topic.to_string())
				.build(),
			false,
		)
		.await
		.unwrap();

	let (broadcaster, mut receiver) = broadcaster();
	let chain = Arc::new(ScriptedChain::new("mainnet"));
	let engine = MatchingEngine::new(chain, registry.clone()).with_transaction_listener(broadcaster);

	for number in 1..=3u64 {
		let block = BlockBuilder::new()
			.number(number)
			.transaction(
				TransactionBuilder::new()
					.log(LogBuilder::new().topic(topic).build())
					.build(),
			)
			.build();
		assert_eq!(engine.transaction_pass(&block).await.len(), 1);
	}

	assert_eq!(drain(&mut receiver, MessageType::Transaction).len(), 3);
	assert!(registry.monitor(&spec_id).await.is_some());
}

#[tokio::test]
async fn test_one_time_monitor_matches_once_across_concurrent_blocks() {
	let node = NodeBuilder::new().build();
	let registry = registry_for(&[&node]);
	let spec_id = registry
		.register_transaction_monitor(MonitorBuilder::new().build(), false)
		.await
		.unwrap();

	let (broadcaster, mut receiver) = broadcaster();
	let chain = Arc::new(ScriptedChain::new("mainnet"));
	let first = MatchingEngine::new(chain.clone(), registry.clone())
		.with_transaction_listener(broadcaster.clone());
	let second =
		MatchingEngine::new(chain, registry.clone()).with_transaction_listener(broadcaster);

	let block_a = BlockBuilder::new()
		.number(10)
		.transaction(TransactionBuilder::new().build())
		.build();
	let block_b = BlockBuilder::new()
		.number(11)
		.transaction(TransactionBuilder::new().hash(B256::repeat_byte(0xcd)).build())
		.build();

	let (matched_a, matched_b) =
		tokio::join!(first.transaction_pass(&block_a), second.transaction_pass(&block_b));

	assert_eq!(matched_a.len() + matched_b.len(), 1);
	let published = drain(&mut receiver, MessageType::Transaction);
	assert_eq!(published.len(), 1);
	assert!(registry.monitor(&spec_id).await.is_none());
}

#[tokio::test]
async fn test_confirmed_to_address_monitor_fires_once_then_is_removed() {
	let node = NodeBuilder::new().build();
	let registry: Arc<SubscriptionRegistry> = registry_for(&[&node]);
	let spec_id = registry
		.register_transaction_monitor(
			MonitorBuilder::new()
				.type_(TransactionIdentifierType::ToAddress)
				.value("0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD")
				.status(TransactionStatus::Confirmed)
				.build(),
			false,
		)
		.await
		.unwrap();

	let mut client = mainnet_client();
	client.expect_get_transaction_receipt().returning(|hash| {
		Ok(Some(TransactionReceipt {
			transaction_hash: hash,
			block_hash: B256::repeat_byte(0x07),
			block_number: 7,
			success: true,
			logs: vec![],
		}))
	});

	let (broadcaster, mut receiver) = broadcaster();
	let engine = MatchingEngine::new(Arc::new(client), registry.clone())
		.with_extension(Arc::new(ReceiptStatusExtension))
		.with_transaction_listener(broadcaster);

	let recipient = Address::from_str("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd").unwrap();
	let block = BlockBuilder::new()
		.number(7)
		.transaction(TransactionBuilder::new().to(recipient).build())
		.build();

	let matched = engine.transaction_pass(&block).await;
	assert_eq!(matched.len(), 1);
	assert_eq!(matched[0].spec_id, spec_id);
	assert_eq!(matched[0].transaction.status, TransactionStatus::Confirmed);
	assert!(registry.monitor(&spec_id).await.is_none());

	// The spec is gone, so the same transaction in a later block is not broadcast again
	let later = BlockBuilder::new()
		.number(8)
		.transaction(TransactionBuilder::new().to(recipient).build())
		.build();
	assert!(engine.transaction_pass(&later).await.is_empty());

	let published = drain(&mut receiver, MessageType::Transaction);
	assert_eq!(published.len(), 1);
	assert_eq!(published[0].destination, "transaction-events");
	assert_eq!(published[0].key, block.hash.to_string());
}

#[tokio::test]
async fn test_status_outside_the_spec_does_not_match() {
	let node = NodeBuilder::new().build();
	let registry = registry_for(&[&node]);
	let spec_id = registry
		.register_transaction_monitor(
			MonitorBuilder::new().status(TransactionStatus::Confirmed).build(),
			false,
		)
		.await
		.unwrap();

	let mut client = mainnet_client();
	client
		.expect_get_transaction_receipt()
		.returning(|_| Ok(None));
	let engine = MatchingEngine::new(Arc::new(client), registry.clone())
		.with_extension(Arc::new(ReceiptStatusExtension));

	let block = BlockBuilder::new()
		.number(4)
		.transaction(TransactionBuilder::new().build())
		.build();
	assert!(engine.transaction_pass(&block).await.is_empty());
	assert!(registry.monitor(&spec_id).await.is_some());
}
