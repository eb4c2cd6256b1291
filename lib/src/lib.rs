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

//! Streams GemFire function results and region entry events into a
//! single-threaded host runtime.
//!
//! Native calls block on worker threads and native notifications arrive on
//! SDK threads; everything the host sees is emitted on the host thread, in
//! order, through an [`Emitter`].
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//! use gemfire_bridge::{BridgeConfig, EventLoop, FunctionCall, FunctionExecutor, HostValue};
//! # use gemfire_bridge::{Emitter, FunctionExecution};
//! # use std::sync::Arc;
//!
//! # async fn example(
//! #     execution: Arc<dyn FunctionExecution>,
//! #     emitter: Rc<dyn Emitter>,
//! # ) -> gemfire_bridge::Result<()> {
//! let config = BridgeConfig::default();
//! gemfire_bridge::init_logging(&config);
//!
//! let event_loop = EventLoop::new(&config)?;
//! let executor = FunctionExecutor::with_config(event_loop.clone(), &config);
//!
//! let options = HostValue::object([("arguments", HostValue::from("ping"))]);
//! if let FunctionCall::Streaming(handle) =
//!     executor.execute(execution, "Echo", &options, emitter)?
//! {
//!     event_loop.run().await?;
//!     assert!(handle.is_finalized());
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Core Public Modules
// ============================================================================

/// Error types for gemfire-bridge
pub mod error;

/// Configuration types
pub mod config;

/// Host runtime model: values, emitters, event loop
pub mod host;

/// Native client capability surface
pub mod native;

/// Host/native value conversion
pub mod conversions;

/// Function execution
pub mod functions;

/// Region entry events
pub mod regions;

// ============================================================================
// Internal Modules (visible to integration tests)
// ============================================================================

#[cfg_attr(not(test), doc(hidden))]
pub mod channels;
#[cfg_attr(not(test), doc(hidden))]
pub mod managers;
#[cfg_attr(not(test), doc(hidden))]
pub mod test_support;

// ============================================================================
// Clean Public API
// ============================================================================

pub use error::{BridgeError, Result};

pub use config::BridgeConfig;

pub use host::{event_names, CrossThreadSignal, Emitter, EventLoop, HostError, HostValue};

pub use native::{
    CacheListener, EntryEvent, ExecutionRequest, ExecutionTarget, FunctionExecution,
    NativeException, NativeValue, PdxInstance, RegionId, ResultCollector,
};

pub use conversions::{DefaultValueConverter, ValueConverter};

pub use channels::{EventStream, ResultBuffer, ResultStream};

pub use functions::{
    ExecuteFunctionOptions, ExecutionHandle, FunctionCall, FunctionExecutionTask,
    FunctionExecutor, StreamingCollector, TaskLifecycle,
};

pub use regions::{RegionEvent, RegionEventKind, RegionEventRouter, RegionWrapper};

/// Logging initialization - call before any other logger setup
pub use managers::{init_logging, try_init_logging_with_level};
