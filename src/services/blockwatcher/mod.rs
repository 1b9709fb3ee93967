//! Block watcher service implementation.
//!
//! Produces an ordered, resumable stream of blocks per node:
//! - `strategy`: the subscription contract, listener registration and strategy selection
//! - `polling` / `push`: the two ways blocks are obtained from a node
//! - `cache`: recent blocks per node, the freshest checkpoint
//! - `storage`: durable checkpoints

mod cache;
mod error;
mod polling;
mod push;
mod storage;
mod strategy;

pub use cache::{BlockCache, BlockCheckResult};
pub use error::BlockWatcherError;
pub use polling::PollingDriver;
pub use push::PushDriver;
pub use storage::{BlockStorage, FileBlockStorage};
pub use strategy::{
	create_block_strategy, BlockListener, BlockStreamDriver, BlockSubscription,
	BlockSubscriptionStrategy, ErrorCallback, FetchOutcome, ListenerId, StrategyCore,
	SubscriptionHandle,
};
