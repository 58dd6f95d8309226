//! [`FieldValue`]: the loosely typed value captured from a form field or
//! held by a flattened profile.
//!
//! The wire form is plain, untagged JSON. JSON strings always decode to
//! [`FieldValue::Text`]; [`FieldValue::Timestamp`] only arises in-process and
//! encodes as an RFC 3339 string.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Field locator → value, as captured (or inverted) for one page.
pub type Fields = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldValue {
  Null,
  Bool(bool),
  Integer(i64),
  Float(f64),
  Text(String),
  Timestamp(DateTime<Utc>),
  /// e.g. the selected options of a multi-select.
  List(Vec<FieldValue>),
  Object(BTreeMap<String, FieldValue>),
}

impl FieldValue {
  pub fn text(s: impl Into<String>) -> Self { Self::Text(s.into()) }

  pub fn is_null(&self) -> bool { matches!(self, Self::Null) }

  /// Only scalars take part in value matching.
  pub fn is_scalar(&self) -> bool {
    matches!(
      self,
      Self::Bool(_)
        | Self::Integer(_)
        | Self::Float(_)
        | Self::Text(_)
        | Self::Timestamp(_)
    )
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  /// String rendering of a scalar. `None` for null and structured values.
  pub fn render(&self) -> Option<String> {
    match self {
      Self::Bool(b) => Some(b.to_string()),
      Self::Integer(i) => Some(i.to_string()),
      Self::Float(f) => Some(f.to_string()),
      Self::Text(s) => Some(s.clone()),
      Self::Timestamp(ts) => Some(encode_timestamp(*ts)),
      Self::Null | Self::List(_) | Self::Object(_) => None,
    }
  }
}

fn encode_timestamp(ts: DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ─── Conversions ─────────────────────────────────────────────────────────────

impl From<Value> for FieldValue {
  fn from(v: Value) -> Self {
    match v {
      Value::Null => Self::Null,
      Value::Bool(b) => Self::Bool(b),
      Value::Number(n) => match n.as_i64() {
        Some(i) => Self::Integer(i),
        None => n.as_f64().map_or(Self::Null, Self::Float),
      },
      Value::String(s) => Self::Text(s),
      Value::Array(items) => {
        Self::List(items.into_iter().map(Self::from).collect())
      }
      Value::Object(map) => Self::Object(
        map.into_iter().map(|(k, v)| (k, Self::from(v))).collect(),
      ),
    }
  }
}

impl From<FieldValue> for Value {
  fn from(v: FieldValue) -> Self {
    match v {
      FieldValue::Null => Value::Null,
      FieldValue::Bool(b) => Value::Bool(b),
      FieldValue::Integer(i) => Value::from(i),
      FieldValue::Float(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
      FieldValue::Text(s) => Value::String(s),
      FieldValue::Timestamp(ts) => Value::String(encode_timestamp(ts)),
      FieldValue::List(items) => {
        Value::Array(items.into_iter().map(Value::from).collect())
      }
      FieldValue::Object(map) => Value::Object(
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
      ),
    }
  }
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for FieldValue {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<bool> for FieldValue {
  fn from(b: bool) -> Self { Self::Bool(b) }
}

impl From<i64> for FieldValue {
  fn from(i: i64) -> Self { Self::Integer(i) }
}

impl From<f64> for FieldValue {
  fn from(f: f64) -> Self { Self::Float(f) }
}

impl From<DateTime<Utc>> for FieldValue {
  fn from(ts: DateTime<Utc>) -> Self { Self::Timestamp(ts) }
}
