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
use std::sync::Arc;

use log::{error, trace};

use super::event::{RegionEvent, RegionEventKind};
use crate::channels::EventStream;
use crate::native::{CacheListener, EntryEvent};

/// The single native listener shared by every region the binding creates.
///
/// Each callback snapshots the entry event and queues it; nothing here may
/// unwind into the SDK's notification thread.
pub struct RegionEventListener {
    stream: Arc<EventStream<RegionEvent>>,
}

impl RegionEventListener {
    pub fn new(stream: Arc<EventStream<RegionEvent>>) -> Self {
        Self { stream }
    }

    fn publish(&self, kind: RegionEventKind, entry: &EntryEvent) {
        let queued = panic::catch_unwind(AssertUnwindSafe(|| {
            self.stream.add(RegionEvent::from_entry(kind, entry))
        }));
        match queued {
            Ok(true) => {}
            Ok(false) => trace!(
                "Dropping {} event for {}: router is shut down",
                kind.event_name(),
                entry.region
            ),
            Err(_) => error!(
                "Failed to queue {} event for {}",
                kind.event_name(),
                entry.region
            ),
        }
    }
}

impl CacheListener for RegionEventListener {
    fn after_create(&self, event: &EntryEvent) {
        self.publish(RegionEventKind::Create, event);
    }

    fn after_update(&self, event: &EntryEvent) {
        self.publish(RegionEventKind::Update, event);
    }

    fn after_destroy(&self, event: &EntryEvent) {
        self.publish(RegionEventKind::Destroy, event);
    }
}
