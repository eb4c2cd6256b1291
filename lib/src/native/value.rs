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

/// A typed value in the native client's object model.
///
/// The variant is the dynamic type tag the SDK attaches to every cacheable.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Undefined,
    Null,
    String(String),
    Boolean(bool),
    Double(f64),
    Float(f32),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Date(DateTime<Utc>),
    List(Vec<NativeValue>),
    /// Entries in server iteration order.
    Map(Vec<(NativeValue, NativeValue)>),
    Set(Vec<NativeValue>),
    /// A query result row; field order is significant.
    Struct(Vec<(String, NativeValue)>),
    Pdx(PdxInstance),
    /// One member of a distributed function execution failed.
    ///
    /// Arrives inline with ordinary results so the remaining members' results
    /// are still delivered.
    UserFunctionException(String),
}

impl NativeValue {
    pub fn string(value: impl Into<String>) -> Self {
        NativeValue::String(value.into())
    }

    /// Short type tag used in log and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeValue::Undefined => "CacheableUndefined",
            NativeValue::Null => "null",
            NativeValue::String(_) => "CacheableString",
            NativeValue::Boolean(_) => "CacheableBoolean",
            NativeValue::Double(_) => "CacheableDouble",
            NativeValue::Float(_) => "CacheableFloat",
            NativeValue::Int16(_) => "CacheableInt16",
            NativeValue::Int32(_) => "CacheableInt32",
            NativeValue::Int64(_) => "CacheableInt64",
            NativeValue::Date(_) => "CacheableDate",
            NativeValue::List(_) => "CacheableArrayList",
            NativeValue::Map(_) => "CacheableHashMap",
            NativeValue::Set(_) => "CacheableHashSet",
            NativeValue::Struct(_) => "Struct",
            NativeValue::Pdx(_) => "PdxInstance",
            NativeValue::UserFunctionException(_) => "UserFunctionExecutionException",
        }
    }
}

/// A portable (PDX) object: a class name plus ordered fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PdxInstance {
    pub class_name: String,
    pub fields: Vec<(String, NativeValue)>,
}

impl PdxInstance {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: NativeValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }
}
