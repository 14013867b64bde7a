//! The parsed pipeline document.
//!
//! A [`Config`] is assembled from one of several historical YAML shapes:
//! the legacy `pipeline:` map of named containers, or a `steps:` list.
//! In both shapes consecutive containers that share a `group` form one
//! group; every other container is a group of its own.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};

use crate::container::Container;
use crate::de::{self, scalar_to_string};
use crate::params::ParamValue;

/// A parsed pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct Config {
    /// Pipeline name. `default` when not given.
    pub name: String,
    /// Target platform, e.g. `linux/amd64`.
    pub platform: String,
    /// Workspace override.
    pub workspace: Workspace,
    /// Clone behaviour.
    pub clone: CloneSettings,
    /// Ordered groups of pipeline containers.
    pub pipeline: Vec<Vec<Container>>,
    /// Service containers.
    pub services: Vec<Container>,
    /// Declared top-level volumes.
    pub volumes: BTreeMap<String, Resource>,
    /// Declared top-level networks.
    pub networks: BTreeMap<String, Resource>,
    /// Declared secrets.
    pub secrets: BTreeMap<String, SecretDecl>,
    /// Pipeline labels.
    pub labels: BTreeMap<String, String>,
}

impl Config {
    /// Iterates over every pipeline container across all groups.
    pub fn pipeline_containers(&self) -> impl Iterator<Item = &Container> {
        self.pipeline.iter().flatten()
    }

    /// Returns `true` if no pipeline containers are declared.
    #[must_use]
    pub fn is_pipeline_empty(&self) -> bool {
        self.pipeline_containers().next().is_none()
    }
}

/// Workspace base and path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Workspace {
    /// Base directory shared by every step.
    pub base: String,
    /// Path relative to the base where the repository is cloned.
    pub path: String,
}

/// Clone behaviour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CloneSettings {
    /// Skip the clone step entirely.
    pub disable: bool,
    /// Clone depth passed to the clone plugin. Zero means full history.
    pub depth: i64,
    /// Custom clone container replacing the built-in one.
    pub container: Option<Container>,
}

impl CloneSettings {
    fn from_value(value: Value) -> Result<Self, String> {
        let Value::Mapping(mut mapping) = value else {
            return match value {
                Value::Null => Ok(Self::default()),
                other => Err(format!("clone must be a mapping, got {other:?}")),
            };
        };
        let flag = |mapping: &mut Mapping, key: &str| mapping.remove(key);
        let disable = flag(&mut mapping, "disable")
            .or_else(|| flag(&mut mapping, "disabled"))
            .map(|v| v.as_bool().ok_or("clone.disable must be a boolean"))
            .transpose()?
            .unwrap_or(false);
        let depth = flag(&mut mapping, "depth")
            .map(|v| v.as_i64().ok_or("clone.depth must be an integer"))
            .transpose()?
            .unwrap_or(0);
        let container = if mapping.contains_key("image") {
            let mut container: Container =
                serde_yaml::from_value(Value::Mapping(mapping)).map_err(|e| e.to_string())?;
            tugboat_common::constants::CLONE_STEP_NAME.clone_into(&mut container.name);
            Some(container)
        } else {
            None
        };
        Ok(Self {
            disable,
            depth,
            container,
        })
    }
}

/// A declared top-level volume or network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Resource {
    /// Driver name. Empty means the engine default.
    pub driver: String,
    /// Driver options.
    #[serde(deserialize_with = "de::slice_map")]
    pub driver_opts: BTreeMap<String, String>,
}

/// A declared secret.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SecretDecl {
    /// Secret provided outside the pipeline.
    pub external: External,
    /// Secret read from a file.
    pub file: String,
    /// Secret driver.
    pub driver: String,
    /// Driver options.
    pub driver_opts: BTreeMap<String, ParamValue>,
}

/// `external: true` or `external: { name: ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct External {
    /// Whether the resource is external.
    pub external: bool,
    /// External name, when it differs from the declared one.
    pub name: String,
}

impl<'de> Deserialize<'de> for External {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Self::default()),
            Value::Bool(external) => Ok(Self {
                external,
                name: String::new(),
            }),
            Value::Mapping(mapping) => {
                let name = mapping
                    .get("name")
                    .and_then(scalar_to_string)
                    .unwrap_or_default();
                Ok(Self {
                    external: !name.is_empty(),
                    name,
                })
            }
            other => Err(D::Error::custom(format!(
                "external must be a boolean or mapping, got {other:?}"
            ))),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawConfig {
    name: String,
    platform: Value,
    workspace: Workspace,
    clone: Value,
    pipeline: Value,
    steps: Value,
    services: Value,
    volumes: BTreeMap<String, Option<Resource>>,
    networks: BTreeMap<String, Option<Resource>>,
    secrets: BTreeMap<String, Option<SecretDecl>>,
    #[serde(deserialize_with = "de::slice_map")]
    labels: BTreeMap<String, String>,
}

impl TryFrom<RawConfig> for Config {
    type Error = String;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let steps = if raw.pipeline.is_null() {
            raw.steps
        } else {
            raw.pipeline
        };
        let name = if raw.name.is_empty() {
            tugboat_common::constants::DEFAULT_RESOURCE_NAME.to_string()
        } else {
            raw.name
        };
        Ok(Self {
            name,
            platform: platform_from_value(&raw.platform)?,
            workspace: raw.workspace,
            clone: CloneSettings::from_value(raw.clone)?,
            pipeline: group(containers_from_value(steps)?),
            services: containers_from_value(raw.services)?,
            volumes: flatten_decls(raw.volumes),
            networks: flatten_decls(raw.networks),
            secrets: flatten_decls(raw.secrets),
            labels: raw.labels,
        })
    }
}

fn flatten_decls<T: Default>(decls: BTreeMap<String, Option<T>>) -> BTreeMap<String, T> {
    decls
        .into_iter()
        .map(|(name, decl)| (name, decl.unwrap_or_default()))
        .collect()
}

/// `platform: linux/amd64`, `platform: { os: linux, arch: arm64 }` or
/// `platform: { name: linux/arm }`.
fn platform_from_value(value: &Value) -> Result<String, String> {
    if let Value::Mapping(mapping) = value {
        let field = |key: &str| mapping.get(key).and_then(scalar_to_string).unwrap_or_default();
        let name = field("name");
        if !name.is_empty() {
            return Ok(name);
        }
        let (os, arch) = (field("os"), field("arch"));
        return Ok(match (os.is_empty(), arch.is_empty()) {
            (true, _) => String::new(),
            (false, true) => format!("{os}/amd64"),
            (false, false) => format!("{os}/{arch}"),
        });
    }
    scalar_to_string(value).ok_or_else(|| format!("invalid platform: {value:?}"))
}

/// Reads containers from a name-keyed mapping or a list of named entries.
fn containers_from_value(value: Value) -> Result<Vec<Container>, String> {
    let parse = |value: Value| -> Result<Container, String> {
        if value.is_null() {
            return Ok(Container::default());
        }
        serde_yaml::from_value(value).map_err(|e| e.to_string())
    };
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Mapping(mapping) => mapping
            .into_iter()
            .map(|(key, val)| -> Result<Container, String> {
                let name = scalar_to_string(&key).ok_or("container names must be strings")?;
                let mut container = parse(val).map_err(|e| format!("{name}: {e}"))?;
                container.name = name;
                Ok(container)
            })
            .collect(),
        Value::Sequence(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, val)| -> Result<Container, String> {
                let container = parse(val).map_err(|e| format!("step {index}: {e}"))?;
                if container.name.is_empty() {
                    return Err(format!("step {index} is missing a name"));
                }
                Ok(container)
            })
            .collect(),
        other => Err(format!("expected a mapping or list of containers, got {other:?}")),
    }
}

/// Groups consecutive containers that share a non-empty `group`.
fn group(containers: Vec<Container>) -> Vec<Vec<Container>> {
    let mut groups: Vec<Vec<Container>> = Vec::new();
    for container in containers {
        let joins_previous = !container.group.is_empty()
            && groups
                .last()
                .and_then(|g| g.last())
                .is_some_and(|prev| prev.group == container.group);
        match groups.last_mut() {
            Some(last) if joins_previous => last.push(container),
            _ => groups.push(vec![container]),
        }
    }
    groups
}
