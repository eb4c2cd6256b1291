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

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// The embedding runtime's dynamic value representation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<HostValue>),
    Object(BTreeMap<String, HostValue>),
    Error(HostError),
}

impl HostValue {
    pub fn string(value: impl Into<String>) -> Self {
        HostValue::String(value.into())
    }

    /// Build a plain object from `(key, value)` pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, HostValue)>,
    {
        HostValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, HostValue::Undefined)
    }

    /// True for values the runtime would treat as a native `Error` instance.
    pub fn is_native_error(&self) -> bool {
        matches!(self, HostValue::Error(_))
    }

    pub fn as_array(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Property lookup with script semantics: missing properties read as `Undefined`.
    pub fn get(&self, property: &str) -> &HostValue {
        const UNDEFINED: &HostValue = &HostValue::Undefined;
        match self {
            HostValue::Object(fields) => fields.get(property).unwrap_or(UNDEFINED),
            _ => UNDEFINED,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Undefined => "undefined",
            HostValue::Null => "null",
            HostValue::Boolean(_) => "boolean",
            HostValue::Number(_) => "number",
            HostValue::String(_) => "string",
            HostValue::Date(_) => "Date",
            HostValue::Array(_) => "Array",
            HostValue::Object(_) => "Object",
            HostValue::Error(_) => "Error",
        }
    }
}

impl From<HostError> for HostValue {
    fn from(error: HostError) -> Self {
        HostValue::Error(error)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::String(value.to_string())
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Number(value)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Boolean(value)
    }
}

/// A host-visible error object: `{ name, message }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostError {
    pub name: String,
    pub message: String,
}

impl HostError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// An error with the runtime's default `Error` name.
    pub fn plain(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}
