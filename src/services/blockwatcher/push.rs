//! Push block stream.
//!
//! Opens the node's block stream first so nothing produced during catch-up is lost, then
//! fetches every block from the start block to the head by number, then follows the stream.
//! Pushed blocks below the next expected number were already delivered and are skipped; a
//! gap in front of a pushed block is filled by number.

use async_trait::async_trait;
use futures::StreamExt;
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

/// Driver consuming server-initiated block delivery
#[derive(Debug, Default, Clone, Copy)]
pub struct PushDriver;

impl PushDriver {
	/// Fetches `next..=up_to` by number, returning the next expected block number
	async fn catch_up(
		&self,
		core: &StrategyCore,
		mut next: u64,
		up_to: u64,
	) -> Result<u64, BlockWatcherError> {
		while next <= up_to {
			match core.fetch_block(next).await {
				Ok(FetchOutcome::Block(block)) => core.trigger_listeners(block).await,
				Ok(FetchOutcome::Malformed) => {}
				Ok(FetchOutcome::NotAvailable) => {
					debug!(node = %core.node().name, "Block {} not available during catch-up", next);
					return Ok(next);
				}
				Err(e) if e.is_transport() => return Err(e.into()),
				Err(e) => {
					warn!(node = %core.node().name, "Catch-up stopped at {}: {}", next, e);
					return Ok(next);
				}
			}
			next += 1;
		}
		Ok(next)
	}
}

#[async_trait]
impl BlockStreamDriver for PushDriver {
	fn kind(&self) -> BlockStrategyType {
		BlockStrategyType::Push
	}

	async fn run(
		&self,
		core: Arc<StrategyCore>,
		start_block: u64,
		mut cancel: watch::Receiver<bool>,
	) -> Result<(), BlockWatcherError> {
		let mut stream = core.client().subscribe_new_blocks().await?;

		let head = core.client().get_latest_block_number().await?;
		let mut next = self.catch_up(&core, start_block, head).await?;

		loop {
			let item = tokio::select! {
				_ = cancelled(&mut cancel) => return Ok(()),
				item = stream.next() => item,
			};

			let block = match item {
				Some(Ok(block)) => block,
				Some(Err(e)) if e.is_transport() => return Err(e.into()),
				Some(Err(e)) => {
					warn!(node = %core.node().name, "Dropping pushed item: {}", e);
					continue;
				}
				None => {
					return Err(BlockWatcherError::network_error(format!(
						"block stream of '{}' closed",
						core.node().name
					)))
				}
			};

			if block.number < next {
				debug!(node = %core.node().name, "Skipping pushed block {} below {}", block.number, next);
				continue;
			}
			if block.number > next {
				next = self.catch_up(&core, next, block.number - 1).await?;
				if next < block.number {
					continue;
				}
			}
			if let Err(reason) = block.validate(&core.node().name, Some(block.number)) {
				warn!(node = %core.node().name, "Dropping malformed pushed block: {}", reason);
				continue;
			}
			next = block.number + 1;
			core.trigger_listeners(block).await;
		}
	}
}
