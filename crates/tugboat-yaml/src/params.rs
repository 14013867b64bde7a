//! Free-form plugin parameters.
//!
//! Any key of a container that is not a known attribute is a plugin
//! parameter. Values are captured once at parse time into the closed
//! [`ParamValue`] type so later stages never inspect raw YAML.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;

use crate::de::scalar_to_string;

/// A plugin parameter value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// An explicit `~` or empty value.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// A whole number.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// An ordered list of values.
    Sequence(Vec<ParamValue>),
    /// A string-keyed mapping.
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Returns `true` for every variant except sequences and maps.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Sequence(_) | Self::Map(_))
    }

    /// Renders a scalar as plain text. Returns `None` for `Null` and
    /// collections.
    #[must_use]
    pub fn scalar_text(&self) -> Option<String> {
        match self {
            Self::Bool(b) => Some(b.to_string()),
            Self::Integer(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Null | Self::Sequence(_) | Self::Map(_) => None,
        }
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n.as_i64().map_or_else(
                || Self::Float(n.as_f64().unwrap_or_default()),
                Self::Integer,
            ),
            Value::String(s) => Self::String(s),
            Value::Sequence(items) => Self::Sequence(items.into_iter().map(Self::from).collect()),
            Value::Mapping(mapping) => {
                let mut map = BTreeMap::new();
                for (key, val) in mapping {
                    match scalar_to_string(&key) {
                        Some(key) => {
                            let _ = map.insert(key, Self::from(val));
                        }
                        None => tracing::trace!(?key, "skipping non-scalar parameter key"),
                    }
                }
                Self::Map(map)
            }
            Value::Tagged(tagged) => Self::from(tagged.value),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl<'de> Deserialize<'de> for ParamValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}
