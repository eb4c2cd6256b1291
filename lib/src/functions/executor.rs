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

//! Entry point for `executeFunction()` calls from the region and cache layer.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::debug;

use super::collector::{BufferingCollector, StreamingCollector};
use super::task::{advance, FunctionExecutionTask, TaskSlot};
use crate::channels::ResultStream;
use crate::config::BridgeConfig;
use crate::conversions::{DefaultValueConverter, ValueConverter};
use crate::error::{BridgeError, Result};
use crate::host::{Emitter, EventLoop, HostValue};
use crate::managers::{log_stream_error, log_stream_start};
use crate::native::{
    ExecutionRequest, FunctionExecution, NativeException, NativeValue, ResultCollector,
};

const MISSING_NAME: &str = "You must provide the name of a function to execute.";
const BAD_FILTER: &str = "You must pass an Array of keys as the filter for executeFunction().";
const BAD_SYNCHRONOUS: &str =
    "You must pass true or false for the synchronous option for executeFunction().";
const BAD_OPTIONS: &str =
    "You must pass either an Array of arguments or an options Object to executeFunction().";
const FILTER_ON_CACHE: &str = "You cannot pass a filter to executeFunction for a Cache.";

static NEXT_EXECUTION_ID: AtomicU64 = AtomicU64::new(1);

/// Options accepted by `executeFunction(name, options)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteFunctionOptions {
    pub arguments: Option<HostValue>,
    pub filter: Option<Vec<HostValue>>,
    pub synchronous: bool,
}

impl ExecuteFunctionOptions {
    /// Accepts `undefined`, an Array of arguments, or an options Object with
    /// optional `arguments`, `filter` and `synchronous` properties.
    pub fn from_host(options: &HostValue) -> Result<Self> {
        match options {
            HostValue::Undefined => Ok(Self::default()),
            HostValue::Array(_) => Ok(Self {
                arguments: Some(options.clone()),
                ..Self::default()
            }),
            HostValue::Object(_) => {
                let arguments = match options.get("arguments") {
                    HostValue::Undefined => None,
                    other => Some(other.clone()),
                };
                let filter = match options.get("filter") {
                    HostValue::Undefined => None,
                    HostValue::Array(keys) => Some(keys.clone()),
                    _ => return Err(BridgeError::validation(BAD_FILTER)),
                };
                let synchronous = match options.get("synchronous") {
                    HostValue::Undefined => false,
                    HostValue::Boolean(flag) => *flag,
                    _ => return Err(BridgeError::validation(BAD_SYNCHRONOUS)),
                };
                Ok(Self {
                    arguments,
                    filter,
                    synchronous,
                })
            }
            _ => Err(BridgeError::validation(BAD_OPTIONS)),
        }
    }
}

/// What `execute` produced.
#[derive(Debug)]
pub enum FunctionCall {
    /// Results will arrive as "data"/"error"/"end" events on the emitter.
    Streaming(ExecutionHandle),
    /// The synchronous result.
    Completed(HostValue),
}

/// Observer for a streaming execution.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    id: String,
    slot: Weak<RefCell<Option<FunctionExecutionTask>>>,
}

impl ExecutionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// True once the execution has released all of its resources.
    pub fn is_finalized(&self) -> bool {
        match self.slot.upgrade() {
            Some(slot) => slot.borrow().is_none(),
            None => true,
        }
    }
}

pub struct FunctionExecutor {
    event_loop: EventLoop,
    converter: Rc<dyn ValueConverter>,
}

impl FunctionExecutor {
    pub fn new(event_loop: EventLoop, converter: Rc<dyn ValueConverter>) -> Self {
        Self {
            event_loop,
            converter,
        }
    }

    pub fn with_config(event_loop: EventLoop, config: &BridgeConfig) -> Self {
        Self::new(
            event_loop,
            Rc::new(DefaultValueConverter::from_config(config)),
        )
    }

    /// Parse `options` and run the function in the requested mode.
    ///
    /// Malformed options are returned as `Err` in both modes. Once the
    /// options are accepted, a streaming call reports every later failure on
    /// `emitter`; a synchronous call returns it.
    pub fn execute(
        &self,
        execution: Arc<dyn FunctionExecution>,
        function_name: &str,
        options: &HostValue,
        emitter: Rc<dyn Emitter>,
    ) -> Result<FunctionCall> {
        if function_name.is_empty() {
            return Err(BridgeError::validation(MISSING_NAME));
        }
        let options = ExecuteFunctionOptions::from_host(options)?;
        if options.filter.is_some() && !execution.target().accepts_filter() {
            return Err(BridgeError::validation(FILTER_ON_CACHE));
        }

        let arguments = options.arguments.as_ref();
        let filter = options.filter.as_deref();
        if options.synchronous {
            self.execute_function_sync(&*execution, function_name, arguments, filter)
                .map(FunctionCall::Completed)
        } else {
            Ok(FunctionCall::Streaming(self.begin_function_execution(
                execution,
                function_name,
                arguments,
                filter,
                emitter,
            )))
        }
    }

    /// Start a streaming execution on the worker pool.
    ///
    /// Argument or filter conversion failures never reach the worker pool;
    /// they are emitted as "error" on the next loop turn.
    pub fn begin_function_execution(
        &self,
        execution: Arc<dyn FunctionExecution>,
        function_name: &str,
        arguments: Option<&HostValue>,
        filter: Option<&[HostValue]>,
        emitter: Rc<dyn Emitter>,
    ) -> ExecutionHandle {
        let id = format!(
            "{function_name}#{}",
            NEXT_EXECUTION_ID.fetch_add(1, Ordering::Relaxed)
        );

        let request = match self.build_request(function_name, arguments, filter) {
            Ok(request) => request,
            Err(error) => {
                log_stream_error("function", &id, &error.to_string());
                let host_error = error.to_host_error();
                self.event_loop.defer(move || emitter.emit_error(host_error));
                return ExecutionHandle {
                    id,
                    slot: Weak::new(),
                };
            }
        };

        log_stream_start("function", &id);
        debug!("[{id}] executing on {}", execution.target());

        let slot: TaskSlot = Rc::new(RefCell::new(None));
        let stream = ResultStream::create(
            &self.event_loop,
            {
                let slot = Rc::clone(&slot);
                move |_: &ResultStream<NativeValue>| {
                    advance(&slot, |task| {
                        task.on_data();
                        task.lifecycle()
                    });
                }
            },
            {
                let slot = Rc::clone(&slot);
                move || {
                    advance(&slot, FunctionExecutionTask::on_end);
                }
            },
        );
        *slot.borrow_mut() = Some(FunctionExecutionTask::new(
            id.clone(),
            Arc::clone(&stream),
            emitter,
            Rc::clone(&self.converter),
        ));

        let collector: Arc<dyn ResultCollector> =
            Arc::new(StreamingCollector::for_stream(Arc::clone(&stream)));
        let completion_slot = Rc::clone(&slot);
        self.event_loop.queue_work(
            move || -> std::result::Result<(), NativeException> {
                let outcome = execution.execute(&request, collector);
                if outcome.is_ok() {
                    // No-op when the collector already saw end_results.
                    stream.end();
                }
                outcome
            },
            move |result: Result<std::result::Result<(), NativeException>>| {
                let outcome = result.and_then(|call| call.map_err(BridgeError::from));
                advance(&completion_slot, |task| task.on_background_complete(outcome));
            },
        );

        ExecutionHandle {
            id,
            slot: Rc::downgrade(&slot),
        }
    }

    /// Run the function on the calling thread and return its results.
    ///
    /// A single result is returned as-is; zero or several come back as an
    /// Array.
    pub fn execute_function_sync(
        &self,
        execution: &dyn FunctionExecution,
        function_name: &str,
        arguments: Option<&HostValue>,
        filter: Option<&[HostValue]>,
    ) -> Result<HostValue> {
        let request = self.build_request(function_name, arguments, filter)?;
        let collector = Arc::new(BufferingCollector::new());
        execution.execute(&request, Arc::clone(&collector) as Arc<dyn ResultCollector>)?;

        let mut results = collector
            .take_results()
            .iter()
            .map(|result| self.converter.to_host(result))
            .collect::<Result<Vec<_>>>()?;

        if results.len() == 1 {
            Ok(results.remove(0))
        } else {
            Ok(HostValue::Array(results))
        }
    }

    fn build_request(
        &self,
        function_name: &str,
        arguments: Option<&HostValue>,
        filter: Option<&[HostValue]>,
    ) -> Result<ExecutionRequest> {
        let mut request = ExecutionRequest::new(function_name);
        if let Some(arguments) = arguments.filter(|a| !a.is_undefined()) {
            request = request.with_arguments(self.converter.to_native(arguments)?);
        }
        if let Some(filter) = filter {
            let keys = filter
                .iter()
                .map(|key| self.converter.to_native_key(key))
                .collect::<Result<Vec<_>>>()?;
            request = request.with_filter(keys);
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_undefined() {
        let options = ExecuteFunctionOptions::from_host(&HostValue::Undefined).unwrap();
        assert_eq!(options, ExecuteFunctionOptions::default());
    }

    #[test]
    fn test_options_array_is_arguments() {
        let args = HostValue::Array(vec![HostValue::from("a")]);
        let options = ExecuteFunctionOptions::from_host(&args).unwrap();
        assert_eq!(options.arguments, Some(args));
        assert!(!options.synchronous);
    }

    #[test]
    fn test_options_object() {
        let options = ExecuteFunctionOptions::from_host(&HostValue::object([
            ("arguments", HostValue::from("x")),
            ("filter", HostValue::Array(vec![HostValue::from("k")])),
            ("synchronous", HostValue::Boolean(true)),
        ]))
        .unwrap();
        assert_eq!(options.arguments, Some(HostValue::from("x")));
        assert_eq!(options.filter, Some(vec![HostValue::from("k")]));
        assert!(options.synchronous);
    }

    #[test]
    fn test_options_rejections() {
        let cases = [
            (
                HostValue::object([("filter", HostValue::from("k"))]),
                BAD_FILTER,
            ),
            (
                HostValue::object([("synchronous", HostValue::from("yes"))]),
                BAD_SYNCHRONOUS,
            ),
            (HostValue::from("arg"), BAD_OPTIONS),
            (HostValue::Null, BAD_OPTIONS),
        ];
        for (options, expected) in cases {
            match ExecuteFunctionOptions::from_host(&options) {
                Err(BridgeError::Validation { message }) => assert_eq!(message, expected),
                other => panic!("Expected validation error for {options:?}, got {other:?}"),
            }
        }
    }
}
