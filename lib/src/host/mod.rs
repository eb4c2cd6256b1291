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

//! Host runtime model: values, emitters, the single-threaded event loop and
//! its cross-thread wake handles.

pub mod emitter;
pub mod event_loop;
pub mod signal;
pub mod value;

pub use emitter::{emit_contained, event_names, Emitter};
pub use event_loop::EventLoop;
pub use signal::CrossThreadSignal;
pub use value::{HostError, HostValue};
