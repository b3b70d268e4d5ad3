//! Dynamically typed SQLite scalars.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::Error;

/// A row produced by a query, keyed by column name in result order.
///
/// NULL and BLOB columns are not materialized, so a missing key means the
/// column was either NULL or a BLOB.
pub type Row = IndexMap<String, Value>;

/// A row produced by `exec`, in the engine's text rendering.
///
/// NULL columns are omitted.
pub type TextRow = IndexMap<String, String>;

/// Typed column or parameter value.
///
/// Rows never contain [`Value::Null`]; it exists so parameters can bind SQL
/// NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
   Null,
   Integer(i64),
   Real(f64),
   Text(String),
}

impl Value {
   /// Returns true if this value is null.
   pub fn is_null(&self) -> bool {
      matches!(self, Value::Null)
   }

   /// Attempts to get this value as an integer.
   pub fn as_integer(&self) -> Option<i64> {
      match self {
         Value::Integer(i) => Some(*i),
         _ => None,
      }
   }

   /// Attempts to get this value as a float.
   pub fn as_real(&self) -> Option<f64> {
      match self {
         Value::Real(r) => Some(*r),
         _ => None,
      }
   }

   /// Attempts to get this value as a string reference.
   pub fn as_text(&self) -> Option<&str> {
      match self {
         Value::Text(s) => Some(s),
         _ => None,
      }
   }
}

impl From<i64> for Value {
   fn from(value: i64) -> Self {
      Value::Integer(value)
   }
}

impl From<i32> for Value {
   fn from(value: i32) -> Self {
      Value::Integer(value.into())
   }
}

impl From<u32> for Value {
   fn from(value: u32) -> Self {
      Value::Integer(value.into())
   }
}

impl From<bool> for Value {
   fn from(value: bool) -> Self {
      Value::Integer(value.into())
   }
}

impl From<f64> for Value {
   fn from(value: f64) -> Self {
      Value::Real(value)
   }
}

impl From<f32> for Value {
   fn from(value: f32) -> Self {
      Value::Real(value.into())
   }
}

impl From<String> for Value {
   fn from(value: String) -> Self {
      Value::Text(value)
   }
}

impl From<&str> for Value {
   fn from(value: &str) -> Self {
      Value::Text(value.to_owned())
   }
}

impl<T: Into<Value>> From<Option<T>> for Value {
   fn from(value: Option<T>) -> Self {
      value.map_or(Value::Null, Into::into)
   }
}

impl TryFrom<&JsonValue> for Value {
   type Error = Error;

   /// Maps a JSON argument onto a bindable value.
   ///
   /// Integers keep their precision when they fit in an `i64`; larger
   /// unsigned values fall back to `f64`. Arrays and objects have no SQLite
   /// representation.
   fn try_from(value: &JsonValue) -> Result<Self, Self::Error> {
      match value {
         JsonValue::Null => Ok(Value::Null),
         JsonValue::Bool(b) => Ok(Value::from(*b)),
         JsonValue::Number(number) => {
            if let Some(int_val) = number.as_i64() {
               Ok(Value::Integer(int_val))
            } else if let Some(uint_val) = number.as_u64() {
               // Only reachable above i64::MAX, precision is lost
               Ok(Value::Real(uint_val as f64))
            } else {
               Ok(Value::Real(number.as_f64().unwrap_or_default()))
            }
         }
         JsonValue::String(s) => Ok(Value::Text(s.clone())),
         JsonValue::Array(_) => Err(Error::UnsupportedType("array".into())),
         JsonValue::Object(_) => Err(Error::UnsupportedType("object".into())),
      }
   }
}

impl From<Value> for JsonValue {
   fn from(value: Value) -> Self {
      match value {
         Value::Null => JsonValue::Null,
         Value::Integer(i) => JsonValue::from(i),
         // Non-finite reals have no JSON form and become null
         Value::Real(r) => JsonValue::from(r),
         Value::Text(s) => JsonValue::String(s),
      }
   }
}
