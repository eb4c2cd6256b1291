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

use std::fmt;

use super::value::NativeValue;

/// Identity of a native region: its full path, e.g. `/exampleRegion`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(full_path: impl Into<String>) -> Self {
        let full_path = full_path.into();
        if full_path.starts_with('/') {
            Self(full_path)
        } else {
            Self(format!("/{full_path}"))
        }
    }

    pub fn full_path(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry mutation as reported by the SDK.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryEvent {
    pub region: RegionId,
    pub key: NativeValue,
    pub old_value: Option<NativeValue>,
    pub new_value: Option<NativeValue>,
}

impl EntryEvent {
    pub fn new(region: RegionId, key: NativeValue) -> Self {
        Self {
            region,
            key,
            old_value: None,
            new_value: None,
        }
    }

    pub fn with_old_value(mut self, value: NativeValue) -> Self {
        self.old_value = Some(value);
        self
    }

    pub fn with_new_value(mut self, value: NativeValue) -> Self {
        self.new_value = Some(value);
        self
    }
}

/// The SDK's cache-listener capability.
///
/// Callbacks run on SDK notification threads. Implementations must not panic
/// or block for long: the SDK thread is shared with other regions.
pub trait CacheListener: Send + Sync {
    fn after_create(&self, event: &EntryEvent);

    fn after_update(&self, event: &EntryEvent);

    fn after_destroy(&self, event: &EntryEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_id_normalizes_leading_slash() {
        assert_eq!(RegionId::new("exampleRegion").full_path(), "/exampleRegion");
        assert_eq!(RegionId::new("/exampleRegion"), RegionId::new("exampleRegion"));
    }
}
