//! Polling block stream.
//!
//! Every `polling_interval_ms` the driver asks the node for its head and fetches each block
//! from the next expected number up to it. A block the node does not have yet ends the
//! round; the next round retries it.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
	models::BlockStrategyType,
	services::blockwatcher::{
		strategy::{cancelled, BlockStreamDriver, FetchOutcome, StrategyCore},
		BlockWatcherError,
	},
};

/// Driver replaying from the start block, then following the head on an interval
#[derive(Debug, Default, Clone, Copy)]
pub struct PollingDriver;

impl PollingDriver {
	/// Runs one polling round, returning the next block number to request
	async fn poll_round(
		&self,
		core: &StrategyCore,
		mut next: u64,
		cancel: &watch::Receiver<bool>,
	) -> Result<u64, BlockWatcherError> {
		let head = match core.client().get_latest_block_number().await {
			Ok(head) => head,
			Err(e) if e.is_transport() => return Err(e.into()),
			Err(e) => {
				warn!(node = %core.node().name, "Skipping poll round: {}", e);
				return Ok(next);
			}
		};

		while next <= head {
			if *cancel.borrow() {
				break;
			}
			match core.fetch_block(next).await {
				Ok(FetchOutcome::Block(block)) => {
					core.trigger_listeners(block).await;
					next += 1;
				}
				Ok(FetchOutcome::Malformed) => next += 1,
				Ok(FetchOutcome::NotAvailable) => {
					debug!(node = %core.node().name, "Block {} not available yet", next);
					break;
				}
				Err(e) if e.is_transport() => return Err(e.into()),
				Err(e) => {
					warn!(node = %core.node().name, "Ending poll round at {}: {}", next, e);
					break;
				}
			}
		}
		Ok(next)
	}
}

#[async_trait]
impl BlockStreamDriver for PollingDriver {
	fn kind(&self) -> BlockStrategyType {
		BlockStrategyType::Poll
	}

	async fn run(
		&self,
		core: Arc<StrategyCore>,
		start_block: u64,
		mut cancel: watch::Receiver<bool>,
	) -> Result<(), BlockWatcherError> {
		let interval = core.node().polling_interval();
		let mut next = start_block;

		loop {
			next = self.poll_round(&core, next, &cancel).await?;

			tokio::select! {
				_ = cancelled(&mut cancel) => return Ok(()),
				_ = tokio::time::sleep(interval) => {}
			}
		}
	}
}
