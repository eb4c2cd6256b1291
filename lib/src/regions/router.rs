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

//! Fan-out of native entry events to region wrappers.
//!
//! One [`RegionEventRouter`] owns one [`EventStream`] and one native
//! listener. Region wrappers register on construction and deregister on
//! drop; the router holds them weakly and never keeps one alive.
//!
//! ```text
//!  SDK notification thread          host thread
//!  after_create(e) ─► stream.add ─► emit_callback
//!                                     └─► wrapper(/a).emit("create", {key, oldValue, newValue})
//! ```

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use log::{debug, error, trace};

use super::event::RegionEvent;
use super::listener::RegionEventListener;
use super::wrapper::RegionWrapper;
use crate::channels::EventStream;
use crate::conversions::ValueConverter;
use crate::host::{emit_contained, event_names, EventLoop, HostValue};
use crate::managers::log_stream_error;
use crate::native::{CacheListener, RegionId};

pub type RegistrationId = u64;

struct Registration {
    region: RegionId,
    wrapper: Weak<RegionWrapper>,
}

struct RouterInner {
    stream: Arc<EventStream<RegionEvent>>,
    listener: Arc<RegionEventListener>,
    converter: Rc<dyn ValueConverter>,
    registrations: RefCell<BTreeMap<RegistrationId, Registration>>,
    next_id: Cell<RegistrationId>,
}

/// Cheap to clone; every clone is the same router.
#[derive(Clone)]
pub struct RegionEventRouter {
    inner: Rc<RouterInner>,
}

impl RegionEventRouter {
    pub fn new(event_loop: &EventLoop, converter: Rc<dyn ValueConverter>) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<RouterInner>| {
            let weak = weak.clone();
            let stream = EventStream::create(event_loop, move |_: &EventStream<RegionEvent>| {
                if let Some(inner) = weak.upgrade() {
                    inner.emit_callback();
                }
            });
            RouterInner {
                listener: Arc::new(RegionEventListener::new(Arc::clone(&stream))),
                stream,
                converter,
                registrations: RefCell::new(BTreeMap::new()),
                next_id: Cell::new(1),
            }
        });
        Self { inner }
    }

    /// The native listener to attach to every region this router serves.
    pub fn listener(&self) -> Arc<dyn CacheListener> {
        Arc::clone(&self.inner.listener) as Arc<dyn CacheListener>
    }

    pub fn add(&self, region: RegionId, wrapper: Weak<RegionWrapper>) -> RegistrationId {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        debug!("Registering region {region} for events ({id})");
        self.inner
            .registrations
            .borrow_mut()
            .insert(id, Registration { region, wrapper });
        id
    }

    /// Returns whether `id` was registered.
    pub fn remove(&self, id: RegistrationId) -> bool {
        let removed = self.inner.registrations.borrow_mut().remove(&id);
        match removed {
            Some(registration) => {
                debug!(
                    "Deregistered region {} from events ({id})",
                    registration.region
                );
                true
            }
            None => false,
        }
    }

    pub fn registered_count(&self) -> usize {
        self.inner.registrations.borrow().len()
    }

    /// Deliver everything queued so far. Runs automatically on the event
    /// wake; calling it directly is harmless.
    pub fn emit_callback(&self) {
        self.inner.emit_callback();
    }

    /// Stop accepting events and release the wake handle. Wrappers stay
    /// registered until they are dropped.
    pub fn shutdown(&self) {
        debug!("Shutting down region event router");
        self.inner.stream.close();
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.stream.is_closed()
    }
}

impl RouterInner {
    fn emit_callback(&self) {
        let events = self.stream.next_events();
        trace!("Routing {} region events", events.len());

        for event in events {
            let targets = self.targets_for(&event.region);
            if targets.is_empty() {
                trace!("No listeners for {} on {}", event.kind.event_name(), event.region);
                continue;
            }

            match event.payload(&*self.converter) {
                Ok(payload) => {
                    for target in &targets {
                        deliver(target, event.kind.event_name(), &payload);
                    }
                }
                Err(e) => {
                    log_stream_error("region", event.region.full_path(), &e.to_string());
                    let error = HostValue::Error(e.to_host_error());
                    for target in &targets {
                        deliver(target, event_names::ERROR, &error);
                    }
                }
            }
        }
    }

    /// Live wrappers registered for `region`, snapshotted so emission runs
    /// without the registry borrowed.
    fn targets_for(&self, region: &RegionId) -> Vec<Rc<RegionWrapper>> {
        self.registrations
            .borrow()
            .values()
            .filter(|registration| &registration.region == region)
            .filter_map(|registration| registration.wrapper.upgrade())
            .collect()
    }
}

impl Drop for RouterInner {
    fn drop(&mut self) {
        self.stream.close();
    }
}

fn deliver(target: &RegionWrapper, event_name: &str, payload: &HostValue) {
    if !emit_contained(&**target.emitter(), event_name, Some(payload.clone())) {
        error!(
            "Listener for {event_name} on {} panicked; continuing with other regions",
            target.region()
        );
    }
}
