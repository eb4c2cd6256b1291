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

//! Error types for gemfire-bridge operations.
//!
//! Public API returns `crate::error::Result<T>` with structured `BridgeError`
//! variants. Internal plumbing may use `anyhow::Result<T>`; those errors surface
//! through `BridgeError::Internal` with their chain intact.
//!
//! Every variant has a host-visible shape (see [`BridgeError::to_host_error`]):
//! the `name` is what scripts see in `error.name`, the `message` is the bare
//! message without the Rust-side prefix.
//!
//! # Example
//!
//! ```ignore
//! use gemfire_bridge::error::{BridgeError, Result};
//!
//! fn example() -> Result<()> {
//!     match some_operation() {
//!         Err(BridgeError::Native { name, message }) => {
//!             println!("server said {name}: {message}");
//!         }
//!         Err(e) => return Err(e),
//!         Ok(v) => { /* ... */ }
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::host::HostError;
use crate::native::NativeException;

/// Main error type for gemfire-bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// An exception thrown by the native client, captured by value.
    #[error("{name}: {message}")]
    Native {
        /// Exception category name (e.g. `apache::geode::client::CacheServerException`)
        name: String,
        /// Exception message
        message: String,
    },

    /// A host value could not be used as a native key.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key was rejected
        message: String,
    },

    /// A host value could not be converted into a native value.
    #[error("Invalid value: {message}")]
    InvalidValue {
        /// Description of why the value was rejected
        message: String,
    },

    /// Caller-supplied arguments were malformed.
    #[error("Validation failed: {message}")]
    Validation {
        /// Description of the validation error
        message: String,
    },

    /// A native value could not be converted into a host value.
    #[error("Conversion failed: {message}")]
    Conversion {
        /// Description of the conversion failure
        message: String,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the configuration error
        message: String,
    },

    /// Operation is not valid in the current state.
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Description of the state error
        message: String,
    },

    /// Background work could not be scheduled or did not finish normally.
    #[error("Background work failed: {message}")]
    WorkerFailed {
        /// Description of the worker failure
        message: String,
    },

    /// Internal error - wraps underlying errors while preserving the error chain.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

// ============================================================================
// Constructor helpers for common error patterns
// ============================================================================

impl BridgeError {
    /// Create a native exception error.
    pub fn native(name: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Native {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid key error.
    ///
    /// # Example
    /// ```ignore
    /// BridgeError::invalid_key("Invalid GemFire key.")
    /// ```
    pub fn invalid_key(message: impl Into<String>) -> Self {
        BridgeError::InvalidKey {
            message: message.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        BridgeError::InvalidValue {
            message: message.into(),
        }
    }

    /// Create a validation error.
    ///
    /// # Example
    /// ```ignore
    /// BridgeError::validation("You must provide the name of a function to execute.")
    /// ```
    pub fn validation(message: impl Into<String>) -> Self {
        BridgeError::Validation {
            message: message.into(),
        }
    }

    /// Create a conversion error.
    pub fn conversion(message: impl Into<String>) -> Self {
        BridgeError::Conversion {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        BridgeError::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        BridgeError::InvalidState {
            message: message.into(),
        }
    }

    /// Create a worker failure error.
    pub fn worker_failed(message: impl Into<String>) -> Self {
        BridgeError::WorkerFailed {
            message: message.into(),
        }
    }

    /// The name scripts see in `error.name`.
    pub fn host_name(&self) -> &str {
        match self {
            BridgeError::Native { name, .. } => name,
            BridgeError::InvalidKey { .. } => "InvalidKeyError",
            BridgeError::InvalidValue { .. } => "InvalidValueError",
            BridgeError::WorkerFailed { .. } => "WorkerError",
            BridgeError::Validation { .. }
            | BridgeError::Conversion { .. }
            | BridgeError::InvalidConfig { .. }
            | BridgeError::InvalidState { .. }
            | BridgeError::Internal(_) => "Error",
        }
    }

    /// Build the host-visible error object for this error.
    pub fn to_host_error(&self) -> HostError {
        let message = match self {
            BridgeError::Native { message, .. }
            | BridgeError::InvalidKey { message }
            | BridgeError::InvalidValue { message }
            | BridgeError::Validation { message }
            | BridgeError::Conversion { message }
            | BridgeError::InvalidConfig { message }
            | BridgeError::InvalidState { message }
            | BridgeError::WorkerFailed { message } => message.clone(),
            BridgeError::Internal(err) => format!("{err:#}"),
        };
        HostError::new(self.host_name(), message)
    }
}

impl From<NativeException> for BridgeError {
    fn from(exception: NativeException) -> Self {
        BridgeError::Native {
            name: exception.name,
            message: exception.message,
        }
    }
}

/// Result type for gemfire-bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_display() {
        let err = BridgeError::native("apache::geode::client::TimeoutException", "timed out");
        assert_eq!(
            err.to_string(),
            "apache::geode::client::TimeoutException: timed out"
        );
    }

    #[test]
    fn test_validation_display() {
        let err = BridgeError::validation("Empty function name");
        assert_eq!(err.to_string(), "Validation failed: Empty function name");
    }

    #[test]
    fn test_host_error_uses_exception_name() {
        let err: BridgeError =
            NativeException::new("apache::geode::client::MessageException", "bad message").into();
        let host = err.to_host_error();
        assert_eq!(host.name, "apache::geode::client::MessageException");
        assert_eq!(host.message, "bad message");
    }

    #[test]
    fn test_host_error_for_invalid_key_drops_prefix() {
        let host = BridgeError::invalid_key("Invalid GemFire key.").to_host_error();
        assert_eq!(host.name, "InvalidKeyError");
        assert_eq!(host.message, "Invalid GemFire key.");
    }

    #[test]
    fn test_internal_error_from_anyhow() {
        let anyhow_err = anyhow::anyhow!("Something went wrong");
        let err: BridgeError = anyhow_err.into();
        assert!(matches!(err, BridgeError::Internal(_)));
        assert_eq!(err.host_name(), "Error");
        assert!(err.to_host_error().message.contains("Something went wrong"));
    }

    #[test]
    fn test_error_pattern_matching() {
        let err = BridgeError::worker_failed("pool closed");

        match err {
            BridgeError::WorkerFailed { message } => assert_eq!(message, "pool closed"),
            _ => panic!("Expected WorkerFailed variant"),
        }
    }
}
