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

use std::fmt;
use std::sync::Arc;

use super::exception::NativeException;
use super::value::NativeValue;

/// Where a function execution is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionTarget {
    /// `FunctionService::onRegion` - the data-dependent form that accepts a key filter.
    Region(String),
    /// `FunctionService::onServers` - every server in the pool; filters are not allowed.
    Servers { pool: Option<String> },
}

impl ExecutionTarget {
    pub fn accepts_filter(&self) -> bool {
        matches!(self, ExecutionTarget::Region(_))
    }
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionTarget::Region(path) => write!(f, "region {path}"),
            ExecutionTarget::Servers { pool: Some(pool) } => write!(f, "servers in pool {pool}"),
            ExecutionTarget::Servers { pool: None } => write!(f, "servers in default pool"),
        }
    }
}

/// Fully converted parameters of one function execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRequest {
    pub function_name: String,
    pub arguments: Option<NativeValue>,
    pub filter: Option<Vec<NativeValue>>,
}

impl ExecutionRequest {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            arguments: None,
            filter: None,
        }
    }

    pub fn with_arguments(mut self, arguments: NativeValue) -> Self {
        self.arguments = Some(arguments);
        self
    }

    pub fn with_filter(mut self, filter: Vec<NativeValue>) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// The SDK's result-collector capability.
///
/// The SDK calls `add_result` once per result from its own threads, possibly
/// several concurrently, then `end_results` exactly once when the last member
/// has reported.
pub trait ResultCollector: Send + Sync {
    fn add_result(&self, result: NativeValue);

    fn end_results(&self);

    /// Pull-style access to the aggregate result, if the collector keeps one.
    fn get_result(&self) -> Option<Vec<NativeValue>>;

    fn clear_results(&self) {}
}

/// A native execution context (`Execution` in the SDK) bound to a target.
pub trait FunctionExecution: Send + Sync {
    fn target(&self) -> ExecutionTarget;

    /// Blocking call. Results flow through `collector`; a returned error is a
    /// transport-level failure of the whole execution.
    fn execute(
        &self,
        request: &ExecutionRequest,
        collector: Arc<dyn ResultCollector>,
    ) -> Result<(), NativeException>;
}
