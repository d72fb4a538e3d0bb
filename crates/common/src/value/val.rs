// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use async_graphql_value::ConstValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum ValNumber {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl ValNumber {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ValNumber::I64(n) => Some(*n as f64),
            ValNumber::U64(n) => Some(*n as f64),
            ValNumber::F64(n) => Some(*n),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ValNumber::I64(n) => Some(*n),
            ValNumber::U64(n) => i64::try_from(*n).ok(),
            ValNumber::F64(_) => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, ValNumber::F64(_))
    }
}

impl Display for ValNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValNumber::I64(n) => write!(f, "{n}"),
            ValNumber::U64(n) => write!(f, "{n}"),
            ValNumber::F64(n) => write!(f, "{n}"),
        }
    }
}

impl TryFrom<ValNumber> for serde_json::Number {
    type Error = ();

    fn try_from(value: ValNumber) -> Result<Self, Self::Error> {
        match value {
            ValNumber::I64(n) => Ok(serde_json::Number::from(n)),
            ValNumber::U64(n) => Ok(serde_json::Number::from(n)),
            ValNumber::F64(n) => serde_json::Number::from_f64(n).ok_or(()),
        }
    }
}

impl From<&serde_json::Number> for ValNumber {
    fn from(value: &serde_json::Number) -> Self {
        // serde_json numbers are always one of the three representations
        if let Some(n) = value.as_i64() {
            ValNumber::I64(n)
        } else if let Some(n) = value.as_u64() {
            ValNumber::U64(n)
        } else {
            ValNumber::F64(value.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl From<i32> for ValNumber {
    fn from(value: i32) -> Self {
        ValNumber::I64(value as i64)
    }
}

impl From<i64> for ValNumber {
    fn from(value: i64) -> Self {
        ValNumber::I64(value)
    }
}

impl From<u64> for ValNumber {
    fn from(value: u64) -> Self {
        ValNumber::U64(value)
    }
}

impl From<f64> for ValNumber {
    fn from(value: f64) -> Self {
        ValNumber::F64(value)
    }
}

/// Represent a value that can be used in:
/// - field and directive arguments
/// - resolver return values (and the source value handed to nested resolvers)
/// - request context values
///
/// Objects keep their insertion order so that a response mirrors the selection order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub enum Val {
    Bool(bool),
    Number(ValNumber),
    String(String),
    List(Vec<Val>),
    Object(IndexMap<String, Val>),
    Binary(bytes::Bytes),
    Enum(String),
    #[default]
    Null,
}

impl Val {
    pub fn get(&self, key: &str) -> Option<&Val> {
        match self {
            Val::Object(o) => o.get(key),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Val::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::String(s) | Val::Enum(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    /// JavaScript-like truthiness: `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Null => false,
            Val::Bool(b) => *b,
            Val::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
            Val::String(s) => !s.is_empty(),
            _ => true,
        }
    }
}

impl Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Val::Bool(b) => write!(f, "{b}"),
            Val::Number(n) => write!(f, "{n}"),
            Val::String(s) => write!(f, "\"{s}\""),
            Val::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Val::Object(o) => {
                write!(f, "{{")?;
                for (i, (k, v)) in o.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Val::Binary(_) => write!(f, "Binary"),
            Val::Enum(e) => write!(f, "{e}"),
            Val::Null => write!(f, "null"),
        }
    }
}

impl From<bool> for Val {
    fn from(value: bool) -> Self {
        Val::Bool(value)
    }
}

impl From<i32> for Val {
    fn from(value: i32) -> Self {
        Val::Number(value.into())
    }
}

impl From<i64> for Val {
    fn from(value: i64) -> Self {
        Val::Number(value.into())
    }
}

impl From<f64> for Val {
    fn from(value: f64) -> Self {
        Val::Number(value.into())
    }
}

impl From<&str> for Val {
    fn from(value: &str) -> Self {
        Val::String(value.to_string())
    }
}

impl From<String> for Val {
    fn from(value: String) -> Self {
        Val::String(value)
    }
}

impl<T: Into<Val>> From<Option<T>> for Val {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Val::Null)
    }
}

impl From<ConstValue> for Val {
    fn from(value: ConstValue) -> Self {
        match value {
            ConstValue::Null => Val::Null,
            ConstValue::Boolean(b) => Val::Bool(b),
            ConstValue::Number(n) => Val::Number((&n).into()),
            ConstValue::String(s) => Val::String(s),
            ConstValue::List(l) => Val::List(l.into_iter().map(Val::from).collect()),
            ConstValue::Object(o) => Val::Object(
                o.into_iter()
                    .map(|(k, v)| (k.to_string(), v.into()))
                    .collect(),
            ),
            ConstValue::Binary(b) => Val::Binary(b),
            ConstValue::Enum(e) => Val::Enum(e.to_string()),
        }
    }
}

impl From<serde_json::Value> for Val {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Val::Null,
            serde_json::Value::Bool(b) => Val::Bool(b),
            serde_json::Value::Number(n) => Val::Number((&n).into()),
            serde_json::Value::String(s) => Val::String(s),
            serde_json::Value::Array(l) => Val::List(l.into_iter().map(|v| v.into()).collect()),
            serde_json::Value::Object(o) => {
                Val::Object(o.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiplatform_test::multiplatform_test;
    use serde_json::json;

    #[multiplatform_test]
    fn json_conversion_keeps_object_order() {
        let json = json!({"zeta": 1, "alpha": [true, null, "x"], "mid": {"b": 2.5, "a": -3}});
        let val = Val::from(json);

        let keys: Vec<_> = match &val {
            Val::Object(o) => o.keys().cloned().collect(),
            _ => panic!("expected an object"),
        };
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(
            val.get("alpha"),
            Some(&Val::List(vec![Val::Bool(true), Val::Null, Val::from("x")]))
        );
        assert_eq!(
            val.get("mid").and_then(|mid| mid.get("b")),
            Some(&Val::from(2.5))
        );
    }

    #[multiplatform_test]
    fn const_value_enum_and_number() {
        let value = ConstValue::from_json(json!({"n": 42})).unwrap();
        assert_eq!(
            Val::from(value).get("n"),
            Some(&Val::Number(ValNumber::I64(42)))
        );
        assert_eq!(
            Val::from(ConstValue::Enum(async_graphql_value::Name::new("RED"))),
            Val::Enum("RED".to_string())
        );
    }

    #[multiplatform_test]
    fn truthiness() {
        assert!(!Val::Null.is_truthy());
        assert!(!Val::Bool(false).is_truthy());
        assert!(!Val::from(0).is_truthy());
        assert!(!Val::from("").is_truthy());
        assert!(Val::Bool(true).is_truthy());
        assert!(Val::from("x").is_truthy());
        assert!(Val::List(vec![]).is_truthy());
    }

    #[multiplatform_test]
    fn number_accessors() {
        assert_eq!(ValNumber::from(u64::MAX).as_i64(), None);
        assert_eq!(ValNumber::from(7u64).as_i64(), Some(7));
        assert_eq!(ValNumber::from(1.5).as_i64(), None);
        assert!(ValNumber::from(3).is_integer());
    }
}
