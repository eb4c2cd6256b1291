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

use std::panic::{self, AssertUnwindSafe};

use log::error;

use super::value::{HostError, HostValue};

/// Names of the events the core emits.
pub mod event_names {
    pub const DATA: &str = "data";
    pub const ERROR: &str = "error";
    pub const END: &str = "end";
    pub const CREATE: &str = "create";
    pub const UPDATE: &str = "update";
    pub const DESTROY: &str = "destroy";
}

/// A host object with an `emit(name, payload)` method.
///
/// Only ever called on the host thread, so implementations may hold
/// non-`Send` runtime handles.
pub trait Emitter {
    fn emit(&self, event: &str, payload: Option<HostValue>);

    fn emit_error(&self, error: HostError) {
        self.emit(event_names::ERROR, Some(HostValue::Error(error)));
    }
}

/// Emit through `emitter`, containing a panic raised by the host listener.
/// Returns `false` if the listener panicked.
pub fn emit_contained(emitter: &dyn Emitter, event: &str, payload: Option<HostValue>) -> bool {
    let emitted = panic::catch_unwind(AssertUnwindSafe(|| emitter.emit(event, payload)));
    if emitted.is_err() {
        error!("Listener for '{event}' panicked");
    }
    emitted.is_ok()
}

impl<E: Emitter + ?Sized> Emitter for std::rc::Rc<E> {
    fn emit(&self, event: &str, payload: Option<HostValue>) {
        (**self).emit(event, payload)
    }
}

impl<E: Emitter + ?Sized> Emitter for Box<E> {
    fn emit(&self, event: &str, payload: Option<HostValue>) {
        (**self).emit(event, payload)
    }
}
