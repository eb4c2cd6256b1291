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

use crate::conversions::ValueConverter;
use crate::error::Result;
use crate::host::{event_names, HostValue};
use crate::native::{EntryEvent, NativeValue, RegionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionEventKind {
    Create,
    Update,
    Destroy,
}

impl RegionEventKind {
    /// Name of the host event this kind is emitted as.
    pub fn event_name(self) -> &'static str {
        match self {
            RegionEventKind::Create => event_names::CREATE,
            RegionEventKind::Update => event_names::UPDATE,
            RegionEventKind::Destroy => event_names::DESTROY,
        }
    }
}

/// Immutable snapshot of one entry mutation, taken on the notification
/// thread and handed to the host thread.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionEvent {
    pub kind: RegionEventKind,
    pub region: RegionId,
    pub key: NativeValue,
    pub old_value: Option<NativeValue>,
    pub new_value: Option<NativeValue>,
}

impl RegionEvent {
    pub fn from_entry(kind: RegionEventKind, entry: &EntryEvent) -> Self {
        Self {
            kind,
            region: entry.region.clone(),
            key: entry.key.clone(),
            old_value: entry.old_value.clone(),
            new_value: entry.new_value.clone(),
        }
    }

    /// The `{ key, oldValue, newValue }` payload; absent values read as null.
    pub fn payload(&self, converter: &dyn ValueConverter) -> Result<HostValue> {
        Ok(HostValue::object([
            ("key", converter.to_host(&self.key)?),
            (
                "oldValue",
                converter.to_host_optional(self.old_value.as_ref())?,
            ),
            (
                "newValue",
                converter.to_host_optional(self.new_value.as_ref())?,
            ),
        ]))
    }
}
