//! Container definitions as written in a pipeline document.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::constraint::Constraints;
use crate::de::{self, scalar_to_string, strings_from_value};
use crate::params::ParamValue;

/// A single container definition: a pipeline step, a service, or a
/// custom clone container.
///
/// Unknown keys are collected into [`Container::params`] and later become
/// `PLUGIN_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Container {
    /// Logical name. Filled from the mapping key in the map shape.
    pub name: String,
    /// Image reference, e.g. `golang:1.11`.
    pub image: String,
    /// Consecutive containers sharing a group run in the same stage.
    pub group: String,
    /// Shell commands turned into a build script.
    #[serde(deserialize_with = "de::string_or_seq")]
    pub commands: Vec<String>,
    /// Entrypoint override.
    #[serde(deserialize_with = "de::command")]
    pub entrypoint: Vec<String>,
    /// Command override.
    #[serde(deserialize_with = "de::command")]
    pub command: Vec<String>,
    /// Shell used to run the build script.
    pub shell: String,
    /// Environment variables.
    #[serde(deserialize_with = "de::slice_map")]
    pub environment: BTreeMap<String, String>,
    /// Container labels.
    #[serde(deserialize_with = "de::slice_map")]
    pub labels: BTreeMap<String, String>,
    /// Run in the background for the lifetime of the pipeline.
    #[serde(rename = "detach")]
    pub detached: bool,
    /// Run with extended privileges.
    pub privileged: bool,
    /// Always pull the image.
    pub pull: bool,
    /// Failure does not fail the pipeline.
    #[serde(rename = "allow_failure")]
    pub err_ignore: bool,
    /// Added kernel capabilities.
    pub cap_add: Vec<String>,
    /// Dropped kernel capabilities.
    pub cap_drop: Vec<String>,
    /// Host devices, `source:target`.
    pub devices: Vec<String>,
    /// Tmpfs mounts.
    pub tmpfs: Vec<String>,
    /// Custom DNS servers.
    #[serde(deserialize_with = "de::string_or_seq")]
    pub dns: Vec<String>,
    /// Custom DNS search domains.
    #[serde(deserialize_with = "de::string_or_seq")]
    pub dns_search: Vec<String>,
    /// Extra `/etc/hosts` entries.
    pub extra_hosts: Vec<String>,
    /// Network mode, e.g. `bridge` or `host`.
    pub network_mode: String,
    /// IPC namespace mode.
    pub ipc_mode: String,
    /// Windows isolation technology.
    pub isolation: String,
    /// Namespaced kernel parameters.
    #[serde(deserialize_with = "de::slice_map")]
    pub sysctls: BTreeMap<String, String>,
    /// Memory limit in bytes.
    #[serde(deserialize_with = "de::mem_bytes")]
    pub mem_limit: i64,
    /// Memory plus swap limit in bytes.
    #[serde(rename = "memswap_limit", deserialize_with = "de::mem_bytes")]
    pub mem_swap_limit: i64,
    /// Memory swappiness.
    #[serde(deserialize_with = "de::mem_bytes")]
    pub mem_swappiness: i64,
    /// Size of `/dev/shm` in bytes.
    #[serde(deserialize_with = "de::mem_bytes")]
    pub shm_size: i64,
    /// CPU CFS quota.
    #[serde(deserialize_with = "de::string_int")]
    pub cpu_quota: i64,
    /// CPU shares.
    #[serde(deserialize_with = "de::string_int")]
    pub cpu_shares: i64,
    /// CPUs in which execution is allowed.
    #[serde(rename = "cpuset")]
    pub cpu_set: String,
    /// Volume mounts.
    pub volumes: Vec<VolumeMount>,
    /// Attached networks.
    #[serde(deserialize_with = "network_attachments")]
    pub networks: Vec<NetworkAttachment>,
    /// Secret references.
    pub secrets: Vec<SecretRef>,
    /// Report exports.
    pub reports: Reports,
    /// Conditions under which the container runs.
    #[serde(rename = "when")]
    pub constraints: Constraints,
    /// Plugin parameters.
    #[serde(flatten)]
    pub params: BTreeMap<String, ParamValue>,
}

impl Container {
    /// Creates a container with a name and image.
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Self::default()
        }
    }
}

/// A volume mount, written `source:destination[:mode]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeMount {
    /// Named volume or absolute host path.
    pub source: String,
    /// Path inside the container.
    pub destination: String,
    /// Access mode such as `ro` or `rw`.
    pub access_mode: String,
}

impl VolumeMount {
    fn from_value(value: &Value) -> Result<Self, String> {
        if let Value::Mapping(mapping) = value {
            let mut mount = Self::default();
            for (key, val) in mapping {
                let text = scalar_to_string(val).unwrap_or_default();
                match scalar_to_string(key).as_deref() {
                    Some("source") => mount.source = text,
                    Some("destination" | "target") => mount.destination = text,
                    Some("access_mode" | "mode") => mount.access_mode = text,
                    other => return Err(format!("unknown volume key: {other:?}")),
                }
            }
            return Ok(mount);
        }
        let text = scalar_to_string(value).ok_or("volume must be a string or mapping")?;
        let parts: Vec<&str> = text.split(':').collect();
        match parts.as_slice() {
            [source, destination] => Ok(Self {
                source: (*source).to_string(),
                destination: (*destination).to_string(),
                access_mode: String::new(),
            }),
            [source, destination, mode] => Ok(Self {
                source: (*source).to_string(),
                destination: (*destination).to_string(),
                access_mode: (*mode).to_string(),
            }),
            _ => Err(format!("volume format '{text}' not supported")),
        }
    }
}

impl<'de> Deserialize<'de> for VolumeMount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}

/// A network the container joins, with optional DNS aliases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkAttachment {
    /// Network name.
    pub name: String,
    /// Aliases within the network.
    pub aliases: Vec<String>,
}

fn network_attachments<'de, D>(deserializer: D) -> Result<Vec<NetworkAttachment>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Mapping(mapping) => {
            let mut networks = Vec::with_capacity(mapping.len());
            for (key, val) in mapping {
                let name = scalar_to_string(key)
                    .ok_or_else(|| D::Error::custom("network names must be strings"))?;
                let aliases = match val {
                    Value::Mapping(inner) => inner
                        .get("aliases")
                        .map(strings_from_value)
                        .transpose()
                        .map_err(D::Error::custom)?
                        .unwrap_or_default(),
                    _ => Vec::new(),
                };
                networks.push(NetworkAttachment { name, aliases });
            }
            Ok(networks)
        }
        other => Ok(strings_from_value(other)
            .map_err(D::Error::custom)?
            .into_iter()
            .map(|name| NetworkAttachment {
                name,
                aliases: Vec::new(),
            })
            .collect()),
    }
}

/// A reference to a named secret, exposed under `target`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretRef {
    /// Name of the secret.
    pub source: String,
    /// Environment variable alias, lowercase by convention.
    pub target: String,
}

impl<'de> Deserialize<'de> for SecretRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if let Value::Mapping(mapping) = &value {
            let field = |name: &str| {
                mapping
                    .get(name)
                    .and_then(scalar_to_string)
                    .unwrap_or_default()
            };
            let source = field("source");
            let target = field("target");
            let target = if target.is_empty() { source.clone() } else { target };
            return Ok(Self { source, target });
        }
        let name = scalar_to_string(&value)
            .ok_or_else(|| D::Error::custom("secret must be a name or mapping"))?;
        Ok(Self {
            source: name.clone(),
            target: name,
        })
    }
}

/// Report exports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Reports {
    /// Coverage report.
    pub coverage: Option<Report>,
}

/// A file exported after the step completes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Path of the report inside the workspace.
    pub source: String,
    /// Report format, used as the export mime type.
    pub format: String,
}

impl<'de> Deserialize<'de> for Report {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if let Value::Mapping(mapping) = &value {
            let field = |name: &str| {
                mapping
                    .get(name)
                    .and_then(scalar_to_string)
                    .unwrap_or_default()
            };
            return Ok(Self {
                source: field("source"),
                format: field("format"),
            });
        }
        let source = scalar_to_string(&value)
            .ok_or_else(|| D::Error::custom("report must be a path or mapping"))?;
        Ok(Self {
            source,
            format: String::new(),
        })
    }
}
