//! JSON-RPC over HTTP node client.
//!
//! Talks to any node exposing the `eth_*` JSON-RPC methods. Blocks are requested with full
//! transaction objects. HTTP has no server push, so this client only supports polling.

use alloy::{
	consensus::Transaction as _,
	primitives::{B256, U64},
	rpc::types::{self as rpc, BlockTransactions, SyncStatus},
};
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde_json::{json, Value};
use std::{
	sync::atomic::{AtomicU64, Ordering},
	time::Duration,
};
use tokio::sync::RwLock;
use url::Url;

use crate::{
	models::{Block, ContractLog, LogQuery, Node, Transaction, TransactionReceipt},
	services::blockchain::{BlockChainError, NodeClient},
	utils::{create_retryable_http_client, HttpRetryConfig},
};

fn convert_log(log: &rpc::Log) -> ContractLog {
	ContractLog {
		address: log.address(),
		topics: log.topics().to_vec(),
		data: log.inner.data.data.clone(),
		block_number: log.block_number.unwrap_or_default(),
		block_hash: log.block_hash.unwrap_or_default(),
		transaction_hash: log.transaction_hash.unwrap_or_default(),
		log_index: log.log_index.unwrap_or_default(),
	}
}

fn convert_block(node_name: &str, raw: rpc::Block) -> Result<Block, BlockChainError> {
	let header = raw.header;
	let number = header.inner.number;
	let hash = header.hash;

	let transactions = match raw.transactions {
		BlockTransactions::Full(txs) => txs
			.into_iter()
			.map(|tx| Transaction {
				hash: *tx.inner.tx_hash(),
				from: tx.inner.signer(),
				to: tx.inner.to(),
				block_hash: tx.block_hash.unwrap_or(hash),
				block_number: tx.block_number.unwrap_or(number),
				input: tx.inner.input().clone(),
				status: Default::default(),
				logs: vec![],
			})
			.collect(),
		BlockTransactions::Hashes(hashes) if !hashes.is_empty() => {
			return Err(BlockChainError::malformed_data(format!(
				"block {} on '{}' carries transaction hashes instead of full transactions",
				number, node_name
			)));
		}
		_ => vec![],
	};

	Ok(Block {
		number,
		hash,
		parent_hash: header.inner.parent_hash,
		timestamp: header.inner.timestamp,
		logs_bloom: header.inner.logs_bloom,
		transactions,
		node_name: node_name.to_string(),
	})
}

fn parse_result<T: serde::de::DeserializeOwned>(
	method: &str,
	value: Value,
) -> Result<T, BlockChainError> {
	serde_json::from_value(value).map_err(|e| {
		BlockChainError::malformed_data(format!("Failed to parse {} response: {}", method, e))
	})
}

/// Client for a node speaking JSON-RPC over HTTP
pub struct JsonRpcNodeClient {
	node_name: String,
	url: Url,
	retry_config: HttpRetryConfig,
	client: RwLock<ClientWithMiddleware>,
	request_id: AtomicU64,
}

impl JsonRpcNodeClient {
	/// Creates a client for the node's URL
	///
	/// # Arguments
	/// * `node` - Node configuration, its URL must use `http` or `https`
	/// * `retry_config` - Retry policy for transient HTTP failures
	///
	/// # Returns
	/// * `Result<Self, BlockChainError>` - The client; no request is made yet
	pub fn new(node: &Node, retry_config: HttpRetryConfig) -> Result<Self, BlockChainError> {
		let url = Url::parse(&node.url).map_err(|e| {
			BlockChainError::internal_error(format!("Invalid URL for node '{}': {}", node.name, e))
		})?;
		if !matches!(url.scheme(), "http" | "https") {
			return Err(BlockChainError::unsupported(format!(
				"node '{}' uses scheme '{}', the JSON-RPC client only speaks HTTP",
				node.name,
				url.scheme()
			)));
		}

		let client = Self::build_http_client(&retry_config)?;
		Ok(Self {
			node_name: node.name.clone(),
			url,
			retry_config,
			client: RwLock::new(client),
			request_id: AtomicU64::new(1),
		})
	}

	fn build_http_client(
		retry_config: &HttpRetryConfig,
	) -> Result<ClientWithMiddleware, BlockChainError> {
		let base_client = reqwest::ClientBuilder::new()
			.pool_idle_timeout(Duration::from_secs(90))
			.timeout(Duration::from_secs(30))
			.connect_timeout(Duration::from_secs(10))
			.build()
			.map_err(|e| {
				BlockChainError::internal_error(format!("Failed to create HTTP client: {}", e))
			})?;
		Ok(create_retryable_http_client(retry_config, base_client))
	}

	/// Sends a JSON-RPC request and returns its `result` member
	async fn request(&self, method: &str, params: Value) -> Result<Value, BlockChainError> {
		let id = self.request_id.fetch_add(1, Ordering::Relaxed);
		let body = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});

		let client = self.client.read().await.clone();
		let response = client
			.post(self.url.clone())
			.json(&body)
			.send()
			.await
			.map_err(|e| {
				BlockChainError::connection_error(format!(
					"{} on '{}' failed: {}",
					method, self.node_name, e
				))
			})?;

		let status = response.status();
		if status.is_server_error() {
			return Err(BlockChainError::connection_error(format!(
				"{} on '{}' returned HTTP {}",
				method, self.node_name, status
			)));
		}
		if !status.is_success() {
			return Err(BlockChainError::request_error(format!(
				"{} on '{}' returned HTTP {}",
				method, self.node_name, status
			)));
		}

		let mut payload: Value = response.json().await.map_err(|e| {
			BlockChainError::malformed_data(format!("{} returned invalid JSON: {}", method, e))
		})?;

		if let Some(error) = payload.get("error") {
			return Err(BlockChainError::request_error(format!(
				"{} on '{}' failed: {}",
				method, self.node_name, error
			)));
		}

		payload
			.get_mut("result")
			.map(Value::take)
			.ok_or_else(|| BlockChainError::malformed_data(format!("{} missing 'result'", method)))
	}
}

#[async_trait]
impl NodeClient for JsonRpcNodeClient {
	fn node_name(&self) -> &str {
		&self.node_name
	}

	async fn get_latest_block_number(&self) -> Result<u64, BlockChainError> {
		let result = self.request("eth_blockNumber", json!([])).await?;
		let number: U64 = parse_result("eth_blockNumber", result)?;
		Ok(number.to::<u64>())
	}

	async fn get_block_by_number(&self, number: u64) -> Result<Option<Block>, BlockChainError> {
		let result = self
			.request(
				"eth_getBlockByNumber",
				json!([format!("0x{:x}", number), true]),
			)
			.await?;
		if result.is_null() {
			return Ok(None);
		}
		let raw: rpc::Block = parse_result("eth_getBlockByNumber", result)?;
		convert_block(&self.node_name, raw).map(Some)
	}

	async fn get_logs(&self, query: &LogQuery) -> Result<Vec<ContractLog>, BlockChainError> {
		let mut filter = json!({
			"fromBlock": format!("0x{:x}", query.from_block),
			"toBlock": format!("0x{:x}", query.to_block),
			"topics": query.topics,
		});
		if let Some(address) = query.address {
			filter["address"] = json!(format!("{:#x}", address));
		}

		let result = self.request("eth_getLogs", json!([filter])).await?;
		let logs: Vec<rpc::Log> = parse_result("eth_getLogs", result)?;
		Ok(logs.iter().map(convert_log).collect())
	}

	async fn get_transaction_receipt(
		&self,
		transaction_hash: B256,
	) -> Result<Option<TransactionReceipt>, BlockChainError> {
		let result = self
			.request("eth_getTransactionReceipt", json!([transaction_hash]))
			.await?;
		if result.is_null() {
			return Ok(None);
		}
		let raw: rpc::TransactionReceipt = parse_result("eth_getTransactionReceipt", result)?;
		Ok(Some(TransactionReceipt {
			transaction_hash: raw.transaction_hash,
			block_hash: raw.block_hash.unwrap_or_default(),
			block_number: raw.block_number.unwrap_or_default(),
			success: raw.status(),
			logs: raw.logs().iter().map(convert_log).collect(),
		}))
	}

	async fn is_syncing(&self) -> Result<bool, BlockChainError> {
		let result = self.request("eth_syncing", json!([])).await?;
		let status: SyncStatus = parse_result("eth_syncing", result)?;
		Ok(!matches!(status, SyncStatus::None))
	}

	async fn is_connected(&self) -> bool {
		self.request("net_version", json!([])).await.is_ok()
	}

	async fn reconnect(&self) -> Result<(), BlockChainError> {
		let fresh = Self::build_http_client(&self.retry_config)?;
		*self.client.write().await = fresh;
		self.get_latest_block_number().await.map(|_| ())
	}
}
