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

//! One streaming function execution, from background call to final event.
//!
//! Two things finish independently: the background `execute` call (reported
//! through the loop's work completion) and the result stream (reported by
//! the end wake, or implied by a failed call). The task is released when
//! both have happened, whichever comes first.
//!
//! ```text
//!              background_completed          stream_ended
//!   Running ───────────────────► BackgroundDone ──────────► Finalized
//!      │                                                       ▲
//!      └──────────► StreamEnded ───────────────────────────────┘
//!      stream_ended            background_completed
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, trace};

use crate::channels::ResultStream;
use crate::conversions::ValueConverter;
use crate::error::Result;
use crate::host::{emit_contained, event_names, Emitter, HostError, HostValue};
use crate::managers::{log_stream_end, log_stream_error, log_stream_finalized};
use crate::native::NativeValue;

const STREAM_KIND: &str = "function";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskLifecycle {
    Running,
    BackgroundDone,
    StreamEnded,
    Finalized,
}

impl TaskLifecycle {
    #[must_use]
    pub fn background_completed(self) -> Self {
        match self {
            TaskLifecycle::Running => TaskLifecycle::BackgroundDone,
            TaskLifecycle::StreamEnded => TaskLifecycle::Finalized,
            other => other,
        }
    }

    #[must_use]
    pub fn stream_ended(self) -> Self {
        match self {
            TaskLifecycle::Running => TaskLifecycle::StreamEnded,
            TaskLifecycle::BackgroundDone => TaskLifecycle::Finalized,
            other => other,
        }
    }

    pub fn has_stream_ended(self) -> bool {
        matches!(self, TaskLifecycle::StreamEnded | TaskLifecycle::Finalized)
    }

    pub fn is_finalized(self) -> bool {
        self == TaskLifecycle::Finalized
    }
}

/// Host-side state of a streaming execution. Lives in a [`TaskSlot`];
/// dropping it closes the result stream.
pub struct FunctionExecutionTask {
    id: String,
    stream: Arc<ResultStream<NativeValue>>,
    emitter: Rc<dyn Emitter>,
    converter: Rc<dyn ValueConverter>,
    lifecycle: TaskLifecycle,
}

/// Owner of a task. Host-thread callbacks share it; taking the task out is
/// the one and only finalization.
pub type TaskSlot = Rc<RefCell<Option<FunctionExecutionTask>>>;

impl FunctionExecutionTask {
    pub fn new(
        id: impl Into<String>,
        stream: Arc<ResultStream<NativeValue>>,
        emitter: Rc<dyn Emitter>,
        converter: Rc<dyn ValueConverter>,
    ) -> Self {
        Self {
            id: id.into(),
            stream,
            emitter,
            converter,
            lifecycle: TaskLifecycle::Running,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn lifecycle(&self) -> TaskLifecycle {
        self.lifecycle
    }

    /// Data wake. Emits each buffered result in order, routing per-member
    /// function failures to "error", then releases a producer waiting to end.
    pub fn on_data(&self) {
        let results = self.stream.next_results();
        trace!("[{}] delivering {} results", self.id, results.len());

        for result in &results {
            match self.converter.to_host(result) {
                Ok(HostValue::Error(error)) => self.emit_error(error),
                Ok(value) => self.emit(event_names::DATA, Some(value)),
                Err(e) => {
                    log_stream_error(STREAM_KIND, &self.id, &e.to_string());
                    self.emit_error(e.to_host_error());
                }
            }
        }

        self.stream.results_processed();
    }

    /// End wake.
    pub fn on_end(&mut self) -> TaskLifecycle {
        if self.lifecycle.has_stream_ended() {
            debug!("[{}] ignoring end after the stream already ended", self.id);
            return self.lifecycle;
        }
        self.emit(event_names::END, None);
        log_stream_end(STREAM_KIND, &self.id);
        self.lifecycle = self.lifecycle.stream_ended();
        self.lifecycle
    }

    /// Background call returned. A failed call also ends the stream: no more
    /// data can arrive, so whatever is buffered goes out before the error.
    pub fn on_background_complete(&mut self, outcome: Result<()>) -> TaskLifecycle {
        if let Err(error) = outcome {
            self.on_data();
            log_stream_error(STREAM_KIND, &self.id, &error.to_string());
            self.emit_error(error.to_host_error());
            self.lifecycle = self.lifecycle.stream_ended();
        }
        self.lifecycle = self.lifecycle.background_completed();
        self.lifecycle
    }

    // A panicking listener must not skip results_processed, or the producer
    // waiting in end() never wakes.
    fn emit(&self, event: &str, payload: Option<HostValue>) {
        emit_contained(&*self.emitter, event, payload);
    }

    fn emit_error(&self, error: HostError) {
        self.emit(event_names::ERROR, Some(HostValue::Error(error)));
    }
}

impl std::fmt::Debug for FunctionExecutionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionExecutionTask")
            .field("id", &self.id)
            .field("lifecycle", &self.lifecycle)
            .finish()
    }
}

impl Drop for FunctionExecutionTask {
    fn drop(&mut self) {
        self.stream.close();
        log_stream_finalized(STREAM_KIND, &self.id);
    }
}

/// Apply one step to the task in `slot` and release the task if that step
/// finalized it. Returns whether the task is gone afterwards.
pub fn advance<F>(slot: &TaskSlot, step: F) -> bool
where
    F: FnOnce(&mut FunctionExecutionTask) -> TaskLifecycle,
{
    let lifecycle = match slot.borrow_mut().as_mut() {
        Some(task) => step(task),
        None => return true,
    };
    if lifecycle.is_finalized() {
        // Dropped outside the borrow: the task's Drop closes wake handles.
        let task = slot.borrow_mut().take();
        drop(task);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::conversions::DefaultValueConverter;
    use crate::error::BridgeError;
    use crate::host::EventLoop;
    use crate::test_support::{panicking_emitter, recording_emitter, EmitterProbe};

    fn task_in_slot(event_loop: &EventLoop) -> (TaskSlot, Arc<ResultStream<NativeValue>>, EmitterProbe) {
        let stream = ResultStream::create(event_loop, |_: &ResultStream<NativeValue>| {}, || {});
        let (emitter, probe) = recording_emitter();
        let task = FunctionExecutionTask::new(
            "test-task",
            Arc::clone(&stream),
            emitter,
            Rc::new(DefaultValueConverter::new()),
        );
        (Rc::new(RefCell::new(Some(task))), stream, probe)
    }

    fn test_loop() -> EventLoop {
        EventLoop::new(&BridgeConfig {
            worker_pool_size: 1,
            ..BridgeConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_lifecycle_transitions_commute() {
        let a = TaskLifecycle::Running
            .background_completed()
            .stream_ended();
        let b = TaskLifecycle::Running
            .stream_ended()
            .background_completed();
        assert_eq!(a, TaskLifecycle::Finalized);
        assert_eq!(b, TaskLifecycle::Finalized);
        assert_eq!(
            TaskLifecycle::BackgroundDone.background_completed(),
            TaskLifecycle::BackgroundDone
        );
        assert_eq!(
            TaskLifecycle::StreamEnded.stream_ended(),
            TaskLifecycle::StreamEnded
        );
    }

    #[test]
    fn test_finalizes_once_when_background_completes_first() {
        let event_loop = test_loop();
        let (slot, stream, probe) = task_in_slot(&event_loop);

        assert!(!advance(&slot, |task| task.on_background_complete(Ok(()))));
        assert_eq!(probe.drop_count(), 0);
        assert!(advance(&slot, |task| task.on_end()));
        assert_eq!(probe.drop_count(), 1);
        assert!(slot.borrow().is_none());
        assert!(stream.is_closed());

        // Late wakes find nothing to do.
        assert!(advance(&slot, |task| task.on_end()));
        assert_eq!(probe.drop_count(), 1);
        assert_eq!(probe.names(), vec!["end"]);
    }

    #[test]
    fn test_finalizes_once_when_stream_ends_first() {
        let event_loop = test_loop();
        let (slot, _stream, probe) = task_in_slot(&event_loop);

        assert!(!advance(&slot, |task| task.on_end()));
        assert_eq!(probe.drop_count(), 0);
        assert!(advance(&slot, |task| task.on_background_complete(Ok(()))));
        assert_eq!(probe.drop_count(), 1);
        assert!(advance(&slot, |task| task.on_background_complete(Ok(()))));
        assert_eq!(probe.drop_count(), 1);
    }

    #[test]
    fn test_failed_call_flushes_data_then_errors_and_finalizes() {
        let event_loop = test_loop();
        let (slot, stream, probe) = task_in_slot(&event_loop);
        stream.add(NativeValue::Int32(1));

        let failure = BridgeError::native("apache::geode::client::CacheServerException", "boom");
        assert!(advance(&slot, |task| task.on_background_complete(Err(failure))));

        assert_eq!(probe.names(), vec!["data", "error"]);
        assert_eq!(
            probe.events()[1].payload,
            Some(HostValue::Error(HostError::new(
                "apache::geode::client::CacheServerException",
                "boom"
            )))
        );
        assert_eq!(probe.drop_count(), 1);
    }

    #[test]
    fn test_member_failure_is_routed_to_error_in_order() {
        let event_loop = test_loop();
        let (slot, stream, probe) = task_in_slot(&event_loop);
        stream.add(NativeValue::string("first"));
        stream.add(NativeValue::UserFunctionException("member 2 failed".to_string()));
        stream.add(NativeValue::string("second"));

        advance(&slot, |task| {
            task.on_data();
            task.lifecycle()
        });

        let events = probe.events();
        assert_eq!(probe.names(), vec!["data", "error", "data"]);
        assert_eq!(events[0].payload, Some(HostValue::string("first")));
        assert_eq!(
            events[1].payload,
            Some(HostValue::Error(HostError::plain("member 2 failed")))
        );
        assert_eq!(events[2].payload, Some(HostValue::string("second")));
    }

    #[test]
    fn test_panicking_data_listener_still_acknowledges_batch() {
        let event_loop = test_loop();
        let stream = ResultStream::create(&event_loop, |_: &ResultStream<NativeValue>| {}, || {});
        let (emitter, probe) = panicking_emitter("data");
        let slot: TaskSlot = Rc::new(RefCell::new(Some(FunctionExecutionTask::new(
            "panicking-listener",
            Arc::clone(&stream),
            emitter,
            Rc::new(DefaultValueConverter::new()),
        ))));
        stream.add(NativeValue::Int32(1));
        stream.add(NativeValue::Int32(2));

        assert!(!advance(&slot, |task| {
            task.on_data();
            task.lifecycle()
        }));

        assert_eq!(probe.names(), vec!["data", "data"]);
        // Drained and acknowledged, so ending does not wait on the consumer.
        assert!(stream.end());
        assert!(!advance(&slot, |task| task.on_end()));
        assert!(advance(&slot, |task| task.on_background_complete(Ok(()))));
        assert_eq!(probe.names(), vec!["data", "data", "end"]);
    }
}
