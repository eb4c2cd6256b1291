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

use std::sync::Arc;

use super::buffer::ResultBuffer;
use crate::host::{CrossThreadSignal, EventLoop};

/// Unbounded event feed from native notification threads to the host thread.
///
/// Unlike [`ResultStream`](super::ResultStream) there is no end and no
/// backpressure. The wake handle is referenced only while events are
/// waiting: [`add`](Self::add) refs it and [`next_events`](Self::next_events)
/// unrefs it, both under the buffer lock, so an idle feed never keeps the
/// host process alive and a pending event always does.
pub struct EventStream<T> {
    buffer: ResultBuffer<T>,
    signal: CrossThreadSignal,
}

impl<T: Send + 'static> EventStream<T> {
    pub fn new(signal: CrossThreadSignal) -> Self {
        signal.set_ref(false);
        Self {
            buffer: ResultBuffer::new(),
            signal,
        }
    }

    /// Register the wake handle on `event_loop` and build the stream.
    /// `on_events` runs on the host thread whenever events are waiting.
    pub fn create<F>(event_loop: &EventLoop, mut on_events: F) -> Arc<Self>
    where
        F: FnMut(&EventStream<T>) + 'static,
    {
        Arc::new_cyclic(|weak| {
            let weak = weak.clone();
            let signal = event_loop.async_handle(move || {
                if let Some(stream) = weak.upgrade() {
                    on_events(&*stream);
                }
            });
            Self::new(signal)
        })
    }

    /// Callable from any thread. Never blocks beyond the buffer lock.
    pub fn add(&self, event: T) -> bool {
        self.buffer.push_then(event, || {
            self.signal.set_ref(true);
            self.signal.signal();
        })
    }

    /// Host thread only. Takes every waiting event, oldest first.
    pub fn next_events(&self) -> Vec<T> {
        self.buffer.drain_then(|_| self.signal.set_ref(false))
    }

    pub fn close(&self) {
        self.buffer.close();
        self.signal.close();
    }

    pub fn is_closed(&self) -> bool {
        self.buffer.is_closed()
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        self.signal.close();
    }
}
