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

//! Cross-thread wake handle for the host event loop.
//!
//! A [`CrossThreadSignal`] is the producer half of an async handle registered
//! with [`EventLoop::async_handle`](super::EventLoop::async_handle). Any thread
//! may call [`signal`](CrossThreadSignal::signal); the loop later runs the
//! registered callback on the host thread.
//!
//! # Coalescing
//!
//! A `pending` flag guards the loop's queue: only the call that flips it from
//! `false` to `true` enqueues a wake, and the loop clears it *before* running
//! the callback. A burst of signals therefore produces one callback, and a
//! signal raised while the callback is running produces exactly one more.
//! Delivery is at-least-once per burst, never once per call.
//!
//! # Liveness
//!
//! A referenced (active) handle keeps [`EventLoop::run`](super::EventLoop::run)
//! from returning; a dormant one does not. Handles start referenced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::event_loop::LoopMessage;

pub(crate) type HandleId = u64;

#[derive(Debug)]
pub(crate) struct SignalState {
    pending: AtomicBool,
    referenced: AtomicBool,
    closed: AtomicBool,
}

impl SignalState {
    pub(crate) fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            referenced: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }
    }

    /// Called by the loop right before it runs the callback.
    pub(crate) fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn keeps_loop_alive(&self) -> bool {
        self.referenced.load(Ordering::Acquire) && !self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// `Send + Sync` wake handle bound to one host-thread callback.
#[derive(Clone)]
pub struct CrossThreadSignal {
    id: HandleId,
    state: Arc<SignalState>,
    tx: mpsc::UnboundedSender<LoopMessage>,
}

impl CrossThreadSignal {
    pub(crate) fn new(
        id: HandleId,
        state: Arc<SignalState>,
        tx: mpsc::UnboundedSender<LoopMessage>,
    ) -> Self {
        Self { id, state, tx }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Request one run of the callback. Never blocks.
    ///
    /// Returns `false` when the handle is closed or the loop is gone; the
    /// request is dropped in that case.
    pub fn signal(&self) -> bool {
        if self.state.is_closed() {
            return false;
        }
        if !self.state.pending.swap(true, Ordering::AcqRel)
            && self.tx.send(LoopMessage::Signal(self.id)).is_err()
        {
            return false;
        }
        true
    }

    /// Switch between active (keeps the loop alive) and dormant.
    pub fn set_ref(&self, referenced: bool) {
        let previous = self.state.referenced.swap(referenced, Ordering::AcqRel);
        if previous != referenced {
            // Wake the loop so it re-evaluates liveness.
            let _ = self.tx.send(LoopMessage::RefChanged);
        }
    }

    /// Close the handle. Idempotent; later signals are ignored and the loop
    /// drops the callback on its next turn.
    pub fn close(&self) {
        if !self.state.closed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(LoopMessage::Close(self.id));
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

impl std::fmt::Debug for CrossThreadSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrossThreadSignal")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}
