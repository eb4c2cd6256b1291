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

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use log::trace;

struct BufferState<T> {
    items: VecDeque<T>,
    /// A drained batch the consumer has not acknowledged yet.
    in_flight: bool,
    ended: bool,
    closed: bool,
}

/// Thread-safe FIFO of pending items with an end-of-stream marker.
///
/// Producers call [`push`](Self::push) from any thread; the single consumer
/// calls [`drain`](Self::drain) and, once it has finished with the batch,
/// [`acknowledge`](Self::acknowledge). [`finish`](Self::finish) blocks its
/// caller until everything pushed before it has been drained *and*
/// acknowledged, which is what lets an end notification travel on a separate
/// wake channel without overtaking data.
///
/// The mutex is held only for the append or drain itself, never while the
/// consumer converts or emits a batch.
pub struct ResultBuffer<T> {
    state: Mutex<BufferState<T>>,
    drained: Condvar,
}

impl<T> Default for ResultBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResultBuffer<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BufferState {
                items: VecDeque::new(),
                in_flight: false,
                ended: false,
                closed: false,
            }),
            drained: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BufferState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item. Returns `false` (and drops the item) once closed.
    pub fn push(&self, item: T) -> bool {
        self.push_then(item, || ())
    }

    /// Append an item and run `then` while still holding the lock.
    pub fn push_then<F: FnOnce()>(&self, item: T, then: F) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }
        state.items.push_back(item);
        then();
        true
    }

    /// Take every buffered item in FIFO order. Never blocks on the producer.
    pub fn drain(&self) -> Vec<T> {
        self.drain_then(|_| ())
    }

    /// Take every buffered item and run `then(took_any)` under the lock.
    pub fn drain_then<F: FnOnce(bool)>(&self, then: F) -> Vec<T> {
        let mut state = self.lock();
        let batch: Vec<T> = state.items.drain(..).collect();
        if !batch.is_empty() {
            state.in_flight = true;
        }
        then(!batch.is_empty());
        batch
    }

    /// Release producers waiting in [`finish`](Self::finish) for the most
    /// recently drained batch.
    pub fn acknowledge(&self) {
        let mut state = self.lock();
        state.in_flight = false;
        self.drained.notify_all();
    }

    /// Mark end-of-stream and wait until the buffer is drained and
    /// acknowledged.
    ///
    /// Returns `false` without waiting if the stream was already ended, and
    /// `false` after waking if the buffer was closed meanwhile. Must not be
    /// called on the consumer's thread.
    pub fn finish(&self) -> bool {
        let mut state = self.lock();
        if state.ended {
            trace!("end requested twice; ignoring");
            return false;
        }
        state.ended = true;

        while !state.closed && (!state.items.is_empty() || state.in_flight) {
            state = self
                .drained
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        !state.closed
    }

    /// Refuse further items and wake any producer blocked in
    /// [`finish`](Self::finish). Buffered items are discarded.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.items.clear();
        self.drained.notify_all();
    }

    pub fn is_ended(&self) -> bool {
        self.lock().ended
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }
}
