//! Plugin parameters as `PLUGIN_*` environment variables.
//!
//! Touches: `environment`.

use std::collections::BTreeMap;

use tugboat_common::constants::PLUGIN_ENV_PREFIX;
use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container, ParamValue};

use crate::spec::Step;

/// Flattens every plugin parameter into the step environment.
///
/// # Errors
///
/// Returns an error if a collection parameter cannot be encoded as JSON.
pub fn apply(step: &mut Step, container: &Container, _: &Config) -> Result<()> {
    params_to_env(&container.params, &mut step.environment)
}

/// Writes `PLUGIN_<KEY>` entries for each non-null parameter.
///
/// Scalars are written as text, sequences of scalars are joined with
/// commas, and any other collection is written as compact JSON.
///
/// # Errors
///
/// Returns an error if a collection cannot be encoded as JSON.
pub fn params_to_env(
    params: &BTreeMap<String, ParamValue>,
    env: &mut BTreeMap<String, String>,
) -> Result<()> {
    for (key, value) in params {
        let Some(text) = encode(value)? else {
            continue;
        };
        let _ = env.insert(
            format!("{PLUGIN_ENV_PREFIX}{}", key.to_uppercase()),
            text,
        );
    }
    Ok(())
}

fn encode(value: &ParamValue) -> Result<Option<String>> {
    Ok(match value {
        ParamValue::Null => None,
        ParamValue::Sequence(items) if items.iter().all(ParamValue::is_scalar) => Some(
            items
                .iter()
                .map(|item| item.scalar_text().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(","),
        ),
        ParamValue::Sequence(_) | ParamValue::Map(_) => Some(serde_json::to_string(value)?),
        scalar => scalar.scalar_text(),
    })
}
