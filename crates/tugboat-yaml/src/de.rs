//! Field deserializers for the loosely-typed shapes pipeline authors write.
//!
//! Every helper first reads a [`serde_yaml::Value`] so it works both at the
//! top level and behind `#[serde(flatten)]`, where serde buffers content.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// Renders a YAML scalar as a string. Returns `None` for collections.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Tagged(tagged) => scalar_to_string(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Reads a scalar or a sequence of scalars as a list of strings.
pub(crate) fn strings_from_value(value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items
            .iter()
            .map(|item| {
                scalar_to_string(item).ok_or_else(|| format!("expected a string, got {item:?}"))
            })
            .collect(),
        other => scalar_to_string(other)
            .map(|s| vec![s])
            .ok_or_else(|| format!("expected a string or list, got {other:?}")),
    }
}

/// Reads a mapping of scalars, or a list of `KEY=VALUE` strings.
pub(crate) fn string_map_from_value(value: &Value) -> Result<BTreeMap<String, String>, String> {
    let mut map = BTreeMap::new();
    match value {
        Value::Null => {}
        Value::Mapping(mapping) => {
            for (key, val) in mapping {
                let key = scalar_to_string(key).ok_or("mapping keys must be strings")?;
                let val = scalar_to_string(val)
                    .ok_or_else(|| format!("value of '{key}' must be a string"))?;
                let _ = map.insert(key, val);
            }
        }
        Value::Sequence(_) => {
            for entry in strings_from_value(value)? {
                let (key, val) = entry.split_once('=').unwrap_or((entry.as_str(), ""));
                let _ = map.insert(key.to_string(), val.to_string());
            }
        }
        other => return Err(format!("expected a mapping or list, got {other:?}")),
    }
    Ok(map)
}

/// `dns: 8.8.8.8` or `dns: [8.8.8.8, 8.8.4.4]`.
pub(crate) fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    strings_from_value(&value).map_err(D::Error::custom)
}

/// `command: ./run --fast` (shell-split) or `command: [./run, --fast]`.
pub(crate) fn command<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if let Value::String(line) = &value {
        return shlex::split(line)
            .ok_or_else(|| D::Error::custom(format!("cannot split command: {line}")));
    }
    strings_from_value(&value).map_err(D::Error::custom)
}

/// `environment: { A: b }` or `environment: [ A=b ]`.
pub(crate) fn slice_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    string_map_from_value(&value).map_err(D::Error::custom)
}

/// `shm_size: 67108864` or `shm_size: 64mb`.
pub(crate) fn mem_bytes<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("size out of range: {n}"))),
        Value::String(s) => {
            tugboat_common::units::parse_bytes(&s).map_err(|e| D::Error::custom(e.to_string()))
        }
        other => Err(D::Error::custom(format!("expected a size, got {other:?}"))),
    }
}

/// `cpu_shares: 512` or `cpu_shares: "512"`.
pub(crate) fn string_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("integer out of range: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected an integer, got '{s}'"))),
        other => Err(D::Error::custom(format!("expected an integer, got {other:?}"))),
    }
}
