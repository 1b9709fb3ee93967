//! Logging utilities for the relay.
//!
//! Logging is built on `tracing_subscriber`. Output goes to stdout by default; with
//! `LOG_MODE=file` it goes to daily rolling files under `LOG_DATA_DIR` (default `logs/`).
//! The level comes from `RUST_LOG`, then `LOG_LEVEL`, then defaults to `info`.
//! Records emitted through the `log` crate are captured as well.

use std::env;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

type LoggingResult = Result<(), Box<dyn std::error::Error + Send + Sync + 'static>>;

/// Setup logging according to the `LOG_MODE`, `LOG_DATA_DIR` and `LOG_LEVEL` variables
pub fn setup_logging() -> LoggingResult {
	if env::var("LOG_MODE").map(|mode| mode == "file").unwrap_or(false) {
		let dir = env::var("LOG_DATA_DIR").unwrap_or_else(|_| "logs/".to_string());
		let appender = tracing_appender::rolling::daily(dir, "relay.log");
		setup_logging_with_writer(appender, false)
	} else {
		setup_logging_with_writer(std::io::stdout, true)
	}
}

/// Setup logging with a custom writer
pub fn setup_logging_with_writer<W>(writer: W, ansi: bool) -> LoggingResult
where
	W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
	tracing_subscriber::registry()
		.with(level_filter())
		.with(
			fmt::layer()
				.with_writer(writer)
				.event_format(
					fmt::format()
						.with_level(true)
						.with_target(true)
						.with_thread_ids(false)
						.with_thread_names(false)
						.with_ansi(ansi)
						.compact(),
				)
				.fmt_fields(fmt::format::PrettyFields::new()),
		)
		.try_init()?;
	Ok(())
}

fn level_filter() -> EnvFilter {
	if let Ok(filter) = EnvFilter::try_from_default_env() {
		return filter;
	}
	env::var("LOG_LEVEL")
		.ok()
		.and_then(|level| EnvFilter::try_new(level).ok())
		.unwrap_or_else(|| EnvFilter::new("info"))
}
