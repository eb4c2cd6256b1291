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

//! The native client capability surface.
//!
//! These are the pieces of the GemFire client SDK the streaming core talks to:
//! typed values, captured exceptions, the function-execution call with its
//! result-collector capability, and the cache-listener capability that
//! receives entry events. Implementations live with the region/cache layer
//! (or in tests); the core only depends on the traits.

pub mod exception;
pub mod execution;
pub mod listener;
pub mod value;

pub use exception::NativeException;
pub use execution::{ExecutionRequest, ExecutionTarget, FunctionExecution, ResultCollector};
pub use listener::{CacheListener, EntryEvent, RegionId};
pub use value::{NativeValue, PdxInstance};
