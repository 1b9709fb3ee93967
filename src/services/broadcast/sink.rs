//! Broadcast sinks.
//!
//! A sink moves an envelope to a named destination, tagged with a partition key. Two sinks
//! are bundled:
//! - `WebhookSink`: HTTP POST of the JSON envelope to `{base_url}/{destination}`
//! - `ChannelSink`: in-process tokio broadcast channel, for embedding the relay

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest_middleware::ClientWithMiddleware;
use sha2::Sha256;
use tokio::sync::broadcast;
use url::Url;

use crate::{
	models::MessageEnvelope,
	services::broadcast::BroadcastError,
	utils::{create_retryable_http_client, HttpRetryConfig},
};

/// HMAC SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Destination for broadcast envelopes
#[async_trait]
pub trait BroadcastSink: Send + Sync {
	/// Publishes `envelope` to `destination` under the partition `key`.
	///
	/// # Returns
	/// * `Result<(), BroadcastError>` - Ok once the destination accepted the envelope
	async fn publish(
		&self,
		destination: &str,
		key: &str,
		envelope: &MessageEnvelope,
	) -> Result<(), BroadcastError>;
}

/// Publishes envelopes over HTTP
pub struct WebhookSink {
	client: ClientWithMiddleware,
	base_url: Url,
	/// Secret used to sign request bodies
	secret: Option<String>,
}

impl WebhookSink {
	/// Creates a new webhook sink
	///
	/// # Arguments
	/// * `base_url` - URL every destination name is appended to
	/// * `secret` - Secret to sign requests with (optional)
	/// * `retry_config` - Retry policy for transient HTTP failures
	pub fn new(
		base_url: &str,
		secret: Option<String>,
		retry_config: &HttpRetryConfig,
	) -> Result<Self, BroadcastError> {
		let base_url = Url::parse(base_url).map_err(|e| {
			BroadcastError::config_error(format!("Invalid webhook url '{}': {}", base_url, e))
		})?;
		Ok(Self {
			client: create_retryable_http_client(retry_config, reqwest::Client::new()),
			base_url,
			secret,
		})
	}

	/// URL a destination is published to
	pub fn destination_url(&self, destination: &str) -> String {
		format!(
			"{}/{}",
			self.base_url.as_str().trim_end_matches('/'),
			destination.trim_start_matches('/')
		)
	}

	/// Signs a request body.
	///
	/// # Returns
	/// * `Result<(String, String), BroadcastError>` - Hex HMAC-SHA256 of the body followed by
	///   the timestamp, and the timestamp in milliseconds
	pub fn sign_request(&self, secret: &str, body: &[u8]) -> Result<(String, String), BroadcastError> {
		let timestamp = Utc::now().timestamp_millis().to_string();

		let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
			.map_err(|e| BroadcastError::config_error(format!("Invalid secret: {}", e)))?;
		mac.update(body);
		mac.update(timestamp.as_bytes());

		let signature = hex::encode(mac.finalize().into_bytes());
		Ok((signature, timestamp))
	}

	fn headers(&self, key: &str, body: &[u8]) -> Result<HeaderMap, BroadcastError> {
		let mut headers = HeaderMap::new();
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		let key_value = HeaderValue::from_str(key).map_err(|_| {
			BroadcastError::serialization_error(format!("Partition key '{}' is not a valid header", key))
		})?;
		headers.insert(HeaderName::from_static("x-partition-key"), key_value);

		if let Some(secret) = &self.secret {
			let (signature, timestamp) = self.sign_request(secret, body)?;
			let signature = HeaderValue::from_str(&signature)
				.map_err(|_| BroadcastError::internal_error("Invalid signature value"))?;
			let timestamp = HeaderValue::from_str(&timestamp)
				.map_err(|_| BroadcastError::internal_error("Invalid timestamp value"))?;
			headers.insert(HeaderName::from_static("x-signature"), signature);
			headers.insert(HeaderName::from_static("x-timestamp"), timestamp);
		}

		Ok(headers)
	}
}

#[async_trait]
impl BroadcastSink for WebhookSink {
	async fn publish(
		&self,
		destination: &str,
		key: &str,
		envelope: &MessageEnvelope,
	) -> Result<(), BroadcastError> {
		let body = serde_json::to_vec(envelope)?;
		let headers = self.headers(key, &body)?;

		let response = self
			.client
			.post(self.destination_url(destination))
			.headers(headers)
			.body(body)
			.send()
			.await?;

		if !response.status().is_success() {
			return Err(BroadcastError::network_error(format!(
				"Destination '{}' returned error status: {}",
				destination,
				response.status()
			)));
		}

		Ok(())
	}
}

/// An envelope as seen by in-process subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEnvelope {
	pub destination: String,
	pub key: String,
	pub envelope: MessageEnvelope,
}

/// Publishes envelopes on an in-process broadcast channel
pub struct ChannelSink {
	sender: broadcast::Sender<PublishedEnvelope>,
}

impl ChannelSink {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	/// Receives every envelope published from now on
	pub fn subscribe(&self) -> broadcast::Receiver<PublishedEnvelope> {
		self.sender.subscribe()
	}
}

impl Default for ChannelSink {
	fn default() -> Self {
		Self::new(1024)
	}
}

#[async_trait]
impl BroadcastSink for ChannelSink {
	async fn publish(
		&self,
		destination: &str,
		key: &str,
		envelope: &MessageEnvelope,
	) -> Result<(), BroadcastError> {
		// Nobody subscribed yet; the envelope has no consumer to reach.
		let _ = self.sender.send(PublishedEnvelope {
			destination: destination.to_string(),
			key: key.to_string(),
			envelope: envelope.clone(),
		});
		Ok(())
	}
}
