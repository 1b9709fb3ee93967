//! Reconnect backoff policies.

use backon::{BackoffBuilder, ExponentialBuilder};
use std::time::Duration;

use crate::models::ReconnectConfig;

/// Delays between the attempts of one reconnect round
pub trait ReconnectPolicy: Send + Sync {
	/// A fresh sequence of delays; the round is exhausted when it ends
	fn backoff(&self) -> Box<dyn Iterator<Item = Duration> + Send>;
}

/// Exponential backoff with bounded delays
#[derive(Debug, Clone)]
pub struct BackoffReconnectPolicy {
	initial_delay: Duration,
	max_delay: Duration,
	max_attempts: Option<usize>,
}

impl BackoffReconnectPolicy {
	pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
		Self {
			initial_delay,
			max_delay: max_delay.max(initial_delay),
			max_attempts,
		}
	}
}

impl From<&ReconnectConfig> for BackoffReconnectPolicy {
	fn from(config: &ReconnectConfig) -> Self {
		Self::new(
			Duration::from_millis(config.initial_delay_ms),
			Duration::from_millis(config.max_delay_ms),
			config.max_attempts,
		)
	}
}

impl ReconnectPolicy for BackoffReconnectPolicy {
	fn backoff(&self) -> Box<dyn Iterator<Item = Duration> + Send> {
		let builder = ExponentialBuilder::default()
			.with_min_delay(self.initial_delay)
			.with_max_delay(self.max_delay)
			.with_factor(2.0);
		let builder = match self.max_attempts {
			Some(attempts) => builder.with_max_times(attempts),
			None => builder.without_max_times(),
		};
		Box::new(builder.build())
	}
}
