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

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::host::{Emitter, HostValue};
use crate::native::{
    EntryEvent, ExecutionRequest, ExecutionTarget, FunctionExecution, NativeException,
    NativeValue, RegionId, ResultCollector,
};

/// One `emit` call as seen by a [`RecordingEmitter`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    pub name: String,
    pub payload: Option<HostValue>,
}

/// Emitter that records every event and counts its own drops.
pub struct RecordingEmitter {
    events: Rc<RefCell<Vec<RecordedEvent>>>,
    drops: Rc<Cell<usize>>,
}

impl Emitter for RecordingEmitter {
    fn emit(&self, event: &str, payload: Option<HostValue>) {
        self.events.borrow_mut().push(RecordedEvent {
            name: event.to_string(),
            payload,
        });
    }
}

impl Drop for RecordingEmitter {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

/// Read side of a [`RecordingEmitter`]; stays valid after the emitter is
/// dropped.
#[derive(Clone)]
pub struct EmitterProbe {
    events: Rc<RefCell<Vec<RecordedEvent>>>,
    drops: Rc<Cell<usize>>,
}

impl EmitterProbe {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.borrow().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.borrow().iter().map(|e| e.name.clone()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events.borrow().iter().filter(|e| e.name == name).count()
    }

    pub fn has(&self, name: &str) -> bool {
        self.count(name) > 0
    }

    pub fn drop_count(&self) -> usize {
        self.drops.get()
    }
}

pub fn recording_emitter() -> (Rc<RecordingEmitter>, EmitterProbe) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let drops = Rc::new(Cell::new(0));
    let emitter = Rc::new(RecordingEmitter {
        events: Rc::clone(&events),
        drops: Rc::clone(&drops),
    });
    (emitter, EmitterProbe { events, drops })
}

/// Records like a [`RecordingEmitter`], then panics on one event name.
pub struct PanickingEmitter {
    inner: RecordingEmitter,
    panic_on: String,
}

impl Emitter for PanickingEmitter {
    fn emit(&self, event: &str, payload: Option<HostValue>) {
        self.inner.emit(event, payload);
        if event == self.panic_on {
            panic!("listener for '{event}' failed");
        }
    }
}

pub fn panicking_emitter(panic_on: &str) -> (Rc<PanickingEmitter>, EmitterProbe) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let drops = Rc::new(Cell::new(0));
    let emitter = Rc::new(PanickingEmitter {
        inner: RecordingEmitter {
            events: Rc::clone(&events),
            drops: Rc::clone(&drops),
        },
        panic_on: panic_on.to_string(),
    });
    (emitter, EmitterProbe { events, drops })
}

/// One step of a [`ScriptedExecution`].
#[derive(Debug, Clone)]
pub enum Step {
    Result(NativeValue),
    Pause(Duration),
    End,
    Fail(NativeException),
    Panic(String),
}

/// A `FunctionExecution` that replays a fixed script on the calling thread.
pub struct ScriptedExecution {
    target: ExecutionTarget,
    steps: Vec<Step>,
    requests: Mutex<Vec<ExecutionRequest>>,
}

impl ScriptedExecution {
    pub fn on_region(path: &str) -> Self {
        Self::with_target(ExecutionTarget::Region(RegionId::new(path).full_path().to_string()))
    }

    pub fn on_servers() -> Self {
        Self::with_target(ExecutionTarget::Servers { pool: None })
    }

    fn with_target(target: ExecutionTarget) -> Self {
        Self {
            target,
            steps: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn result(mut self, value: NativeValue) -> Self {
        self.steps.push(Step::Result(value));
        self
    }

    pub fn results<I: IntoIterator<Item = NativeValue>>(mut self, values: I) -> Self {
        self.steps.extend(values.into_iter().map(Step::Result));
        self
    }

    pub fn pause(mut self, millis: u64) -> Self {
        self.steps.push(Step::Pause(Duration::from_millis(millis)));
        self
    }

    pub fn end(mut self) -> Self {
        self.steps.push(Step::End);
        self
    }

    pub fn fail(mut self, name: &str, message: &str) -> Self {
        self.steps
            .push(Step::Fail(NativeException::new(name, message)));
        self
    }

    pub fn panic(mut self, message: &str) -> Self {
        self.steps.push(Step::Panic(message.to_string()));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Every request `execute` has received, oldest first.
    pub fn requests(&self) -> Vec<ExecutionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl FunctionExecution for ScriptedExecution {
    fn target(&self) -> ExecutionTarget {
        self.target.clone()
    }

    fn execute(
        &self,
        request: &ExecutionRequest,
        collector: Arc<dyn ResultCollector>,
    ) -> Result<(), NativeException> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        for step in &self.steps {
            match step {
                Step::Result(value) => collector.add_result(value.clone()),
                Step::Pause(duration) => thread::sleep(*duration),
                Step::End => collector.end_results(),
                Step::Fail(exception) => return Err(exception.clone()),
                Step::Panic(message) => panic!("{message}"),
            }
        }
        Ok(())
    }
}

pub fn entry_created(region: &str, key: NativeValue, value: NativeValue) -> EntryEvent {
    EntryEvent::new(RegionId::new(region), key).with_new_value(value)
}

pub fn entry_updated(
    region: &str,
    key: NativeValue,
    old_value: NativeValue,
    new_value: NativeValue,
) -> EntryEvent {
    EntryEvent::new(RegionId::new(region), key)
        .with_old_value(old_value)
        .with_new_value(new_value)
}

pub fn entry_destroyed(region: &str, key: NativeValue, old_value: NativeValue) -> EntryEvent {
    EntryEvent::new(RegionId::new(region), key).with_old_value(old_value)
}
