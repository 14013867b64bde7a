//! Extra volumes mounted into every step.
//!
//! Touches: `volumes`.

use std::sync::LazyLock;

use regex::Regex;
use tugboat_common::constants::PLATFORM_WINDOWS_AMD64;
use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container};

use super::Transform;
use crate::spec::{Step, VolumeMapping};

static WINDOWS_VOLUME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^((?:\w:)?[^:]*):((?:\w:)?[^:]*)(?::([rwom]*))?").ok()
});

/// Splits a Windows volume mapping, keeping drive letters attached to
/// their path. Empty parts are dropped.
fn split_windows(mapping: &str) -> Vec<String> {
    let captures = WINDOWS_VOLUME
        .as_ref()
        .and_then(|re| re.captures(mapping));
    let Some(captures) = captures else {
        return mapping.split(':').map(ToString::to_string).collect();
    };
    captures
        .iter()
        .skip(1)
        .flatten()
        .map(|m| m.as_str())
        .filter(|part| !part.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Mounts each `source:target` mapping into the step.
///
/// Sources starting with `/` are host paths, anything else names a
/// volume. Mappings that do not split into exactly two parts are
/// skipped.
pub fn volumes(mappings: Vec<String>) -> impl Transform {
    move |step: &mut Step, _: &Container, config: &Config| -> Result<()> {
        for mapping in &mappings {
            let parts = if config.platform == PLATFORM_WINDOWS_AMD64 {
                split_windows(mapping)
            } else {
                mapping.split(':').map(ToString::to_string).collect()
            };
            let [source, target] = parts.as_slice() else {
                tracing::trace!(mapping = %mapping, "skipping malformed volume mapping");
                continue;
            };
            let volume = if source.starts_with('/') {
                VolumeMapping {
                    name: String::new(),
                    source: source.clone(),
                    target: target.clone(),
                }
            } else {
                VolumeMapping {
                    name: source.clone(),
                    source: String::new(),
                    target: target.clone(),
                }
            };
            step.volumes.push(volume);
        }
        Ok(())
    }
}
