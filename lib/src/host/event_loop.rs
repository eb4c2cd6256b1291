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

//! The host runtime's single-threaded event loop.
//!
//! Every host-visible callback (async handle callbacks, background-work
//! completions, deferred callbacks) runs on the thread that drives
//! [`EventLoop::run`], one at a time. Background threads talk to the loop
//! only through an unbounded channel of [`LoopMessage`]s, so nothing they do
//! can block the host thread.
//!
//! ```text
//!  blocking pool / SDK threads               host thread
//!  ───────────────────────────               ───────────
//!  signal.signal()   ──► Signal(id) ──┐
//!  signal.close()    ──► Close(id)  ──┼──► run() ─► handle callback
//!  spawn_blocking    ──► WorkDone   ──┘            completion(result)
//!                                                  deferred callbacks
//! ```
//!
//! A panic in a host callback is logged and contained; the loop keeps
//! running and stays runnable.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use log::{debug, error, trace};
use tokio::runtime::{self, Runtime};
use tokio::sync::mpsc;
use tokio::task::JoinError;

use super::signal::{CrossThreadSignal, HandleId, SignalState};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

type WorkOutcome = std::result::Result<Box<dyn Any + Send>, String>;
type Completion = Box<dyn FnOnce(WorkOutcome)>;

/// Messages delivered from any thread to the host thread.
pub(crate) enum LoopMessage {
    Signal(HandleId),
    Close(HandleId),
    RefChanged,
    WorkDone { id: u64, outcome: WorkOutcome },
}

struct HandleEntry {
    state: Arc<SignalState>,
    callback: Rc<RefCell<dyn FnMut()>>,
}

/// Runtime that owns the blocking pool. Shut down without waiting: a job can
/// be parked in a producer-side wait that only the host thread releases.
struct WorkerRuntime(Option<Runtime>);

impl WorkerRuntime {
    fn start(config: &BridgeConfig) -> Result<Self> {
        let prefix = config.worker_thread_prefix.clone();
        let next_thread = AtomicUsize::new(0);
        let runtime = runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.worker_pool_size)
            .thread_name_fn(move || {
                format!("{prefix}-{}", next_thread.fetch_add(1, Ordering::Relaxed))
            })
            .build()
            .map_err(|e| BridgeError::worker_failed(format!("failed to start workers: {e}")))?;
        debug!(
            "Started worker runtime with {} blocking threads ({}-*)",
            config.worker_pool_size, config.worker_thread_prefix
        );
        Ok(Self(Some(runtime)))
    }

    fn handle(&self) -> Option<&runtime::Handle> {
        self.0.as_ref().map(Runtime::handle)
    }
}

impl Drop for WorkerRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

struct LoopInner {
    tx: mpsc::UnboundedSender<LoopMessage>,
    rx: RefCell<Option<mpsc::UnboundedReceiver<LoopMessage>>>,
    handles: RefCell<HashMap<HandleId, HandleEntry>>,
    completions: RefCell<HashMap<u64, Completion>>,
    deferred: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    next_id: Cell<u64>,
    workers: WorkerRuntime,
}

/// Puts the receiver back when `run_until` returns or unwinds.
struct ReceiverGuard<'a> {
    slot: &'a RefCell<Option<mpsc::UnboundedReceiver<LoopMessage>>>,
    rx: Option<mpsc::UnboundedReceiver<LoopMessage>>,
}

impl Drop for ReceiverGuard<'_> {
    fn drop(&mut self) {
        if let Some(rx) = self.rx.take() {
            *self.slot.borrow_mut() = Some(rx);
        }
    }
}

/// Handle to the host event loop. Cheap to clone; not `Send`.
#[derive(Clone)]
pub struct EventLoop {
    inner: Rc<LoopInner>,
}

impl EventLoop {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        config.validate()?;
        let workers = WorkerRuntime::start(config)?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            inner: Rc::new(LoopInner {
                tx,
                rx: RefCell::new(Some(rx)),
                handles: RefCell::new(HashMap::new()),
                completions: RefCell::new(HashMap::new()),
                deferred: RefCell::new(VecDeque::new()),
                next_id: Cell::new(1),
                workers,
            }),
        })
    }

    fn next_id(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    /// Register a host-thread callback and return the cross-thread handle
    /// that triggers it. The handle starts referenced.
    pub fn async_handle<F>(&self, callback: F) -> CrossThreadSignal
    where
        F: FnMut() + 'static,
    {
        let id = self.next_id();
        let state = Arc::new(SignalState::new());
        self.inner.handles.borrow_mut().insert(
            id,
            HandleEntry {
                state: Arc::clone(&state),
                callback: Rc::new(RefCell::new(callback)),
            },
        );
        trace!("Registered async handle {id}");
        CrossThreadSignal::new(id, state, self.inner.tx.clone())
    }

    /// Run `work` on the blocking pool, then `after` on the host thread with
    /// its result. A panic in `work` reaches `after` as
    /// `BridgeError::WorkerFailed`.
    pub fn queue_work<T, W, A>(&self, work: W, after: A)
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        A: FnOnce(Result<T>) + 'static,
    {
        let id = self.next_id();
        let completion: Completion = Box::new(move |outcome| {
            let result = match outcome {
                Ok(value) => value.downcast::<T>().map(|v| *v).map_err(|_| {
                    BridgeError::worker_failed("background work returned an unexpected type")
                }),
                Err(message) => Err(BridgeError::worker_failed(message)),
            };
            after(result);
        });

        let Some(workers) = self.inner.workers.handle() else {
            self.defer(move || completion(Err("worker runtime is shut down".to_string())));
            return;
        };

        self.inner.completions.borrow_mut().insert(id, completion);
        let tx = self.inner.tx.clone();
        let job = workers.spawn_blocking(work);
        workers.spawn(async move {
            let outcome = match job.await {
                Ok(value) => Ok(Box::new(value) as Box<dyn Any + Send>),
                Err(e) => Err(join_error_message(e)),
            };
            // The loop may be gone; the completion has nowhere to go then.
            let _ = tx.send(LoopMessage::WorkDone { id, outcome });
        });
        trace!("Queued background work {id}");
    }

    /// Run `callback` on the host thread on the next loop turn.
    pub fn defer<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        self.inner.deferred.borrow_mut().push_back(Box::new(callback));
    }

    /// Whether anything still needs the loop: deferred callbacks, background
    /// work in flight, or a referenced open handle.
    pub fn is_alive(&self) -> bool {
        !self.inner.deferred.borrow().is_empty()
            || !self.inner.completions.borrow().is_empty()
            || self
                .inner
                .handles
                .borrow()
                .values()
                .any(|entry| entry.state.keeps_loop_alive())
    }

    /// Number of registered (not yet closed and collected) handles.
    pub fn handle_count(&self) -> usize {
        self.inner.handles.borrow().len()
    }

    /// Drive the loop until nothing keeps it alive.
    pub async fn run(&self) -> Result<()> {
        self.run_until(|| false).await.map(|_| ())
    }

    /// Drive the loop until `done` holds (returns `true`) or nothing keeps
    /// it alive (returns `false`).
    pub async fn run_until<P>(&self, mut done: P) -> Result<bool>
    where
        P: FnMut() -> bool,
    {
        let mut guard = ReceiverGuard {
            slot: &self.inner.rx,
            rx: self.inner.rx.borrow_mut().take(),
        };
        let Some(rx) = guard.rx.as_mut() else {
            return Err(BridgeError::invalid_state("event loop is already running"));
        };

        let satisfied = loop {
            self.run_deferred();
            if done() {
                break true;
            }

            // Drain everything already queued before deciding liveness so a
            // close or wake sent from a callback is never stranded.
            let mut drained = false;
            while let Ok(message) = rx.try_recv() {
                self.dispatch(message);
                self.run_deferred();
                drained = true;
                if done() {
                    break;
                }
            }
            if done() {
                break true;
            }
            if drained {
                continue;
            }
            if !self.is_alive() {
                break false;
            }

            match rx.recv().await {
                Some(message) => self.dispatch(message),
                None => break false,
            }
        };

        Ok(satisfied)
    }

    fn run_deferred(&self) {
        loop {
            let next = self.inner.deferred.borrow_mut().pop_front();
            match next {
                Some(callback) => contained("deferred callback", callback),
                None => break,
            }
        }
    }

    fn dispatch(&self, message: LoopMessage) {
        match message {
            LoopMessage::Signal(id) => {
                let callback = self.inner.handles.borrow().get(&id).and_then(|entry| {
                    if entry.state.is_closed() {
                        return None;
                    }
                    entry.state.take_pending();
                    Some(Rc::clone(&entry.callback))
                });
                if let Some(callback) = callback {
                    match callback.try_borrow_mut() {
                        Ok(mut callback) => contained("async handle callback", || (&mut *callback)()),
                        Err(_) => error!("Async handle {id} re-entered its own callback"),
                    }
                }
            }
            LoopMessage::Close(id) => {
                let removed = self.inner.handles.borrow_mut().remove(&id);
                if removed.is_some() {
                    trace!("Closed async handle {id}");
                }
                drop(removed);
            }
            LoopMessage::RefChanged => {}
            LoopMessage::WorkDone { id, outcome } => {
                let completion = self.inner.completions.borrow_mut().remove(&id);
                match completion {
                    Some(completion) => contained("work completion", || completion(outcome)),
                    None => debug!("Dropping completion for unknown work {id}"),
                }
            }
        }
    }
}

fn contained<F: FnOnce()>(what: &str, callback: F) {
    if panic::catch_unwind(AssertUnwindSafe(callback)).is_err() {
        error!("A {what} panicked; the event loop keeps running");
    }
}

fn join_error_message(error: JoinError) -> String {
    if !error.is_panic() {
        return format!("background work did not complete: {error}");
    }
    let payload = error.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned());
    match detail {
        Some(message) => format!("background work panicked: {message}"),
        None => "background work panicked".to_string(),
    }
}
