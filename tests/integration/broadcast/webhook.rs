//! Broadcasting matched events to webhook destinations.

use alloy::primitives::{Address, B256};
use mockito::Matcher;
use std::{sync::Arc, time::Duration};

use crate::integration::mocks::MockBroadcastSink;
use chain_event_relay::{
	models::{ContractEventDetails, CorrelationIdStrategy, DestinationConfig, MessageType},
	services::broadcast::{BroadcastError, EventBroadcaster, WebhookSink},
	utils::{
		tests::builders::{block::BlockBuilder, filter::FilterBuilder, log::LogBuilder},
		HttpRetryConfig,
	},
};

fn quick_retries(max_retries: u32) -> HttpRetryConfig {
	HttpRetryConfig {
		max_retries,
		initial_backoff: Duration::from_millis(1),
		max_backoff: Duration::from_millis(5),
		..HttpRetryConfig::default()
	}
}

#[tokio::test]
async fn test_contract_event_is_posted_with_correlation_key() {
	let mut server = mockito::Server::new_async().await;
	let holder = B256::left_padding_from(Address::repeat_byte(0x42).as_slice());
	let expected_key = format!("0x{}", hex::encode(holder));

	let mock = server
		.mock("POST", "/contract-events")
		.match_header("X-Partition-Key", expected_key.as_str())
		.match_header("X-Signature", Matcher::Regex("^[0-9a-f]{64}$".to_string()))
		.match_body(Matcher::PartialJson(serde_json::json!({
			"type": "CONTRACT_EVENT",
			"details": {"filter_id": "usdc", "name": "Transfer", "block_number": 103},
		})))
		.with_status(200)
		.expect(1)
		.create_async()
		.await;

	let sink = WebhookSink::new(&server.url(), Some("secret".to_string()), &quick_retries(0)).unwrap();
	let broadcaster = EventBroadcaster::new(Arc::new(sink), DestinationConfig::default());

	let filter = FilterBuilder::new()
		.id("usdc")
		.correlation_id_strategy(CorrelationIdStrategy::IndexedParameter { parameter_index: 0 })
		.build();
	let block = BlockBuilder::new().number(103).build();
	let log = LogBuilder::new()
		.topic(filter.event_topic())
		.topic(holder)
		.block(103, block.hash)
		.build();
	let event = ContractEventDetails::from_log(&filter, &block, &log);

	let envelope = broadcaster
		.broadcast_contract_event(&filter, &event)
		.await
		.unwrap();
	assert_eq!(envelope.type_, MessageType::ContractEvent);
	mock.assert_async().await;
}

#[tokio::test]
async fn test_server_errors_are_retried_then_reported() {
	let mut server = mockito::Server::new_async().await;
	let mock = server
		.mock("POST", "/block-events")
		.with_status(503)
		.expect(3)
		.create_async()
		.await;

	let sink = WebhookSink::new(&server.url(), None, &quick_retries(2)).unwrap();
	let broadcaster = EventBroadcaster::new(Arc::new(sink), DestinationConfig::default());

	let result = broadcaster
		.broadcast_new_block(&BlockBuilder::new().number(9).build())
		.await;
	assert!(matches!(result, Err(BroadcastError::NetworkError(_))));
	mock.assert_async().await;
}

#[tokio::test]
async fn test_custom_destinations_and_message_keys() {
	let mut sink = MockBroadcastSink::new();
	sink.expect_publish()
		.withf(|destination, key, envelope| {
			destination == "ops" && key == "maintenance" && envelope.type_ == MessageType::Message
		})
		.times(1)
		.returning(|_, _, _| Ok(()));

	let destinations = DestinationConfig {
		message: "ops".to_string(),
		..DestinationConfig::default()
	};
	let broadcaster = EventBroadcaster::new(Arc::new(sink), destinations);

	broadcaster
		.broadcast_message("maintenance", serde_json::json!({"window": "02:00"}))
		.await
		.unwrap();
}

#[tokio::test]
async fn test_sink_failure_surfaces_as_network_error() {
	let mut sink = MockBroadcastSink::new();
	sink.expect_publish()
		.times(1)
		.returning(|_, _, _| Err(BroadcastError::internal_error("queue full")));
	let broadcaster = EventBroadcaster::new(Arc::new(sink), DestinationConfig::default());

	let result = broadcaster
		.broadcast_new_block(&BlockBuilder::new().build())
		.await;
	assert!(matches!(result, Err(BroadcastError::NetworkError(_))));
}
