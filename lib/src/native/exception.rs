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

/// An exception raised by a blocking native call.
///
/// Exceptions are copied out of the SDK on the thread that caught them and
/// moved to the host thread as plain data; nothing live crosses the thread
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeException {
    /// Category name, e.g. `apache::geode::client::CacheServerException`
    pub name: String,
    pub message: String,
}

impl NativeException {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for NativeException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

impl std::error::Error for NativeException {}
