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

//! Conversion between host values and native values.
//!
//! The core only ever sees the [`ValueConverter`] trait; [`DefaultValueConverter`]
//! carries the mapping the binding ships with.
//!
//! | host                | native                                   |
//! |---------------------|------------------------------------------|
//! | string              | `String`                                 |
//! | boolean             | `Boolean`                                |
//! | number              | `Double`                                 |
//! | Date                | `Date`                                   |
//! | Array               | `List`                                   |
//! | plain object        | `Pdx` with a `JSON: ...` class name      |
//! | undefined           | `Undefined`                              |
//! | null                | `Null`                                   |
//!
//! In the other direction sets become arrays, maps and structs become plain
//! objects, and a per-member function failure becomes an `Error`.

use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::host::{HostError, HostValue};
use crate::native::{NativeValue, PdxInstance};

const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;
const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

const INVALID_KEY_MESSAGE: &str = "Invalid GemFire key.";

pub trait ValueConverter {
    fn to_native(&self, value: &HostValue) -> Result<NativeValue>;

    /// Like [`to_native`](Self::to_native) but only for values the native
    /// client can hash as a key.
    fn to_native_key(&self, value: &HostValue) -> Result<NativeValue>;

    fn to_host(&self, value: &NativeValue) -> Result<HostValue>;

    /// An absent native value (no old value on create, no new value on
    /// destroy, a missing entry) reads as `null`.
    fn to_host_optional(&self, value: Option<&NativeValue>) -> Result<HostValue> {
        match value {
            Some(value) => self.to_host(value),
            None => Ok(HostValue::Null),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DefaultValueConverter {
    warn_on_unsafe_integers: bool,
}

impl Default for DefaultValueConverter {
    fn default() -> Self {
        Self {
            warn_on_unsafe_integers: true,
        }
    }
}

impl DefaultValueConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self {
            warn_on_unsafe_integers: config.warn_on_unsafe_integers,
        }
    }

    fn int64_to_host(&self, value: i64) -> HostValue {
        if self.warn_on_unsafe_integers {
            if value > MAX_SAFE_INTEGER {
                warn!(
                    "Received 64 bit integer from GemFire greater than \
                     Number.MAX_SAFE_INTEGER (2^53 - 1)"
                );
            } else if value < MIN_SAFE_INTEGER {
                warn!(
                    "Received 64 bit integer from GemFire less than \
                     Number.MIN_SAFE_INTEGER (-1 * 2^53 + 1)"
                );
            }
        }
        HostValue::Number(value as f64)
    }

    fn fields_to_host<'a, I>(&self, fields: I) -> Result<HostValue>
    where
        I: IntoIterator<Item = (&'a String, &'a NativeValue)>,
    {
        let mut object = BTreeMap::new();
        for (name, value) in fields {
            object.insert(name.clone(), self.to_host(value)?);
        }
        Ok(HostValue::Object(object))
    }
}

impl ValueConverter for DefaultValueConverter {
    fn to_native(&self, value: &HostValue) -> Result<NativeValue> {
        match value {
            HostValue::Undefined => Ok(NativeValue::Undefined),
            HostValue::Null => Ok(NativeValue::Null),
            HostValue::Boolean(b) => Ok(NativeValue::Boolean(*b)),
            HostValue::Number(n) => Ok(NativeValue::Double(*n)),
            HostValue::String(s) => Ok(NativeValue::String(s.clone())),
            HostValue::Date(d) => Ok(NativeValue::Date(*d)),
            HostValue::Array(items) => items
                .iter()
                .map(|item| self.to_native(item))
                .collect::<Result<Vec<_>>>()
                .map(NativeValue::List),
            HostValue::Object(fields) => {
                let mut pdx = PdxInstance::new(json_class_name(fields));
                for (name, field) in fields {
                    pdx = pdx.with_field(name.clone(), self.to_native(field)?);
                }
                Ok(NativeValue::Pdx(pdx))
            }
            HostValue::Error(error) => Err(BridgeError::invalid_value(format!(
                "Unable to serialize to GemFire; Error objects are not supported: {error}"
            ))),
        }
    }

    fn to_native_key(&self, value: &HostValue) -> Result<NativeValue> {
        match value {
            HostValue::Boolean(_)
            | HostValue::Number(_)
            | HostValue::String(_)
            | HostValue::Date(_) => self.to_native(value),
            HostValue::Undefined
            | HostValue::Null
            | HostValue::Array(_)
            | HostValue::Object(_)
            | HostValue::Error(_) => Err(BridgeError::invalid_key(INVALID_KEY_MESSAGE)),
        }
    }

    fn to_host(&self, value: &NativeValue) -> Result<HostValue> {
        match value {
            NativeValue::Undefined => Ok(HostValue::Undefined),
            NativeValue::Null => Ok(HostValue::Null),
            NativeValue::String(s) => Ok(HostValue::String(s.clone())),
            NativeValue::Boolean(b) => Ok(HostValue::Boolean(*b)),
            NativeValue::Double(d) => Ok(HostValue::Number(*d)),
            NativeValue::Float(f) => Ok(HostValue::Number(f64::from(*f))),
            NativeValue::Int16(i) => Ok(HostValue::Number(f64::from(*i))),
            NativeValue::Int32(i) => Ok(HostValue::Number(f64::from(*i))),
            NativeValue::Int64(i) => Ok(self.int64_to_host(*i)),
            NativeValue::Date(d) => Ok(HostValue::Date(*d)),
            NativeValue::List(items) | NativeValue::Set(items) => items
                .iter()
                .map(|item| self.to_host(item))
                .collect::<Result<Vec<_>>>()
                .map(HostValue::Array),
            NativeValue::Map(entries) => {
                let mut object = BTreeMap::new();
                for (key, value) in entries {
                    object.insert(property_name(key)?, self.to_host(value)?);
                }
                Ok(HostValue::Object(object))
            }
            NativeValue::Struct(fields) => {
                self.fields_to_host(fields.iter().map(|(name, value)| (name, value)))
            }
            NativeValue::Pdx(pdx) => {
                self.fields_to_host(pdx.fields.iter().map(|(name, value)| (name, value)))
            }
            NativeValue::UserFunctionException(message) => {
                Ok(HostValue::Error(HostError::plain(message.clone())))
            }
        }
    }
}

/// PDX class name for a plain object: `JSON: ` followed by every field name,
/// sorted, with `,[]\` escaped and a `[]` suffix on array-valued fields.
pub fn json_class_name(fields: &BTreeMap<String, HostValue>) -> String {
    let mut names = BTreeSet::new();
    for (name, value) in fields {
        let mut full = String::with_capacity(name.len() * 2 + 3);
        for c in name.chars() {
            if matches!(c, ',' | '[' | ']' | '\\') {
                full.push('\\');
            }
            full.push(c);
        }
        if matches!(value, HostValue::Array(_)) {
            full.push_str("[]");
        }
        full.push(',');
        names.insert(full);
    }

    let mut class_name = String::from("JSON: ");
    for name in names {
        class_name.push_str(&name);
    }
    class_name
}

/// Map keys become property names; only scalar keys have one.
fn property_name(key: &NativeValue) -> Result<String> {
    match key {
        NativeValue::String(s) => Ok(s.clone()),
        NativeValue::Boolean(b) => Ok(b.to_string()),
        NativeValue::Int16(i) => Ok(i.to_string()),
        NativeValue::Int32(i) => Ok(i.to_string()),
        NativeValue::Int64(i) => Ok(i.to_string()),
        NativeValue::Double(d) => Ok(number_to_string(*d)),
        NativeValue::Float(f) => Ok(number_to_string(f64::from(*f))),
        NativeValue::Date(d) => Ok(d.to_rfc3339()),
        other => Err(BridgeError::conversion(format!(
            "Unable to serialize value from GemFire; unsupported map key type: {}",
            other.type_name()
        ))),
    }
}

fn number_to_string(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e21 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn converter() -> DefaultValueConverter {
        DefaultValueConverter::new()
    }

    #[test]
    fn test_scalars_to_native() {
        let c = converter();
        assert_eq!(
            c.to_native(&HostValue::Number(1.5)).unwrap(),
            NativeValue::Double(1.5)
        );
        assert_eq!(c.to_native(&HostValue::Null).unwrap(), NativeValue::Null);
        assert_eq!(
            c.to_native(&HostValue::Undefined).unwrap(),
            NativeValue::Undefined
        );
        assert_eq!(
            c.to_native(&HostValue::from("foo")).unwrap(),
            NativeValue::string("foo")
        );
    }

    #[test]
    fn test_object_becomes_pdx_with_json_class_name() {
        let value = HostValue::object([
            ("tags", HostValue::Array(vec![HostValue::from("a")])),
            ("name", HostValue::from("widget")),
            ("a,b", HostValue::Boolean(true)),
        ]);
        match converter().to_native(&value).unwrap() {
            NativeValue::Pdx(pdx) => {
                assert_eq!(pdx.class_name, "JSON: a\\,b,name,tags[],");
                assert_eq!(pdx.fields.len(), 3);
            }
            other => panic!("Expected Pdx, got {other:?}"),
        }
    }

    #[test]
    fn test_error_value_is_rejected() {
        let result = converter().to_native(&HostValue::from(HostError::plain("nope")));
        assert!(matches!(result, Err(BridgeError::InvalidValue { .. })));
    }

    #[test]
    fn test_invalid_keys() {
        let c = converter();
        for key in [
            HostValue::Null,
            HostValue::Undefined,
            HostValue::object([("a", HostValue::Null)]),
            HostValue::Array(vec![]),
        ] {
            match c.to_native_key(&key) {
                Err(BridgeError::InvalidKey { message }) => {
                    assert_eq!(message, "Invalid GemFire key.")
                }
                other => panic!("Expected InvalidKey for {key:?}, got {other:?}"),
            }
        }
        assert_eq!(
            c.to_native_key(&HostValue::from("key")).unwrap(),
            NativeValue::string("key")
        );
    }

    #[test]
    fn test_collections_to_host() {
        let c = converter();
        let set = NativeValue::Set(vec![NativeValue::Int32(1), NativeValue::Int16(2)]);
        assert_eq!(
            c.to_host(&set).unwrap(),
            HostValue::Array(vec![HostValue::Number(1.0), HostValue::Number(2.0)])
        );

        let map = NativeValue::Map(vec![
            (NativeValue::string("foo"), NativeValue::Boolean(true)),
            (NativeValue::Int32(7), NativeValue::Null),
        ]);
        assert_eq!(
            c.to_host(&map).unwrap(),
            HostValue::object([("foo", HostValue::Boolean(true)), ("7", HostValue::Null)])
        );

        let row = NativeValue::Struct(vec![("id".to_string(), NativeValue::Int64(3))]);
        assert_eq!(
            c.to_host(&row).unwrap(),
            HostValue::object([("id", HostValue::Number(3.0))])
        );
    }

    #[test]
    fn test_unsupported_map_key_fails_conversion() {
        let map = NativeValue::Map(vec![(NativeValue::List(vec![]), NativeValue::Null)]);
        assert!(matches!(
            converter().to_host(&map),
            Err(BridgeError::Conversion { .. })
        ));
    }

    #[test]
    fn test_unsafe_int64_converts_lossily() {
        let value = converter().to_host(&NativeValue::Int64(i64::MAX)).unwrap();
        assert_eq!(value, HostValue::Number(i64::MAX as f64));
    }

    #[test]
    fn test_user_function_exception_becomes_error() {
        let value = converter()
            .to_host(&NativeValue::UserFunctionException("member failed".to_string()))
            .unwrap();
        assert!(value.is_native_error());
        assert_eq!(value, HostValue::Error(HostError::plain("member failed")));
    }

    #[test]
    fn test_absent_value_reads_null() {
        assert_eq!(
            converter().to_host_optional(None).unwrap(),
            HostValue::Null
        );
    }

    #[test]
    fn test_date_round_trip() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let c = converter();
        let native = c.to_native(&HostValue::Date(date)).unwrap();
        assert_eq!(c.to_host(&native).unwrap(), HostValue::Date(date));
    }
}
