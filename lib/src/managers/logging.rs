// Copyright 2025 The Drasi Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging setup and shared log helpers.
//!
//! Library code logs through the `log` facade. [`init_logging`] installs a
//! `tracing-subscriber` console subscriber plus the `tracing-log` bridge so
//! both `log::info!()` and `tracing::info!()` reach the same output.

use log::{debug, error, trace};

use crate::config::BridgeConfig;

/// Install the global subscriber using the configured default level.
///
/// `RUST_LOG` wins over `config.log_level` when set. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
pub fn init_logging(config: &BridgeConfig) {
    let _ = try_init_logging_with_level(&config.log_level);
}

/// Try to install the global subscriber, returning whether this call
/// installed it.
pub fn try_init_logging_with_level(default_level: &str) -> bool {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    // Ignore the error if another logger already owns the log facade.
    let _ = tracing_log::LogTracer::init();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_level(true));

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

pub fn log_stream_start(kind: &str, id: &str) {
    debug!("Starting {kind} stream: {id}");
}

pub fn log_stream_end(kind: &str, id: &str) {
    debug!("Finished {kind} stream: {id}");
}

pub fn log_stream_error(kind: &str, id: &str, error: &str) {
    error!("Error in {kind} stream {id}: {error}");
}

pub fn log_stream_finalized(kind: &str, id: &str) {
    trace!("Released {kind} stream: {id}");
}
