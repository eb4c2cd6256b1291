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

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Runtime settings for the bridge.
///
/// # Example
///
/// ```yaml
/// worker_pool_size: 8
/// worker_thread_prefix: gemfire-worker
/// log_level: debug
/// warn_on_unsafe_integers: false
/// ```
///
/// Every field is optional; omitted fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Number of background threads running blocking native calls (default: 4)
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,
    /// Name prefix for worker threads; threads are named `{prefix}-{index}`
    #[serde(default = "default_worker_thread_prefix")]
    pub worker_thread_prefix: String,
    /// Default log filter used when `RUST_LOG` is not set (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log a warning when a 64-bit integer loses precision on its way to the host
    #[serde(default = "default_warn_on_unsafe_integers")]
    pub warn_on_unsafe_integers: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: default_worker_pool_size(),
            worker_thread_prefix: default_worker_thread_prefix(),
            log_level: default_log_level(),
            warn_on_unsafe_integers: default_warn_on_unsafe_integers(),
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: BridgeConfig = serde_yaml::from_str(yaml)
            .map_err(|e| BridgeError::invalid_config(format!("failed to parse YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| BridgeError::invalid_config(format!("failed to serialize YAML: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_pool_size == 0 {
            return Err(BridgeError::invalid_config(
                "worker_pool_size must be greater than zero",
            ));
        }

        if self.worker_thread_prefix.trim().is_empty() {
            return Err(BridgeError::invalid_config(
                "worker_thread_prefix must not be empty",
            ));
        }

        if self.log_level.trim().is_empty() {
            return Err(BridgeError::invalid_config("log_level must not be empty"));
        }

        Ok(())
    }
}

fn default_worker_pool_size() -> usize {
    4
}

fn default_worker_thread_prefix() -> String {
    "gemfire-worker".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_warn_on_unsafe_integers() -> bool {
    true
}
