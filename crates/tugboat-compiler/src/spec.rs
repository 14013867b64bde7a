//! The execution spec handed to the runtime engine.
//!
//! Field names are part of the contract with the engine; everything is
//! serialized in `snake_case` and empty collections are omitted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A compiled pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Spec {
    /// Spec format version.
    pub version: u32,
    /// Stages, executed in order.
    pub stages: Vec<Stage>,
    /// Volumes created before the first stage.
    pub volumes: Vec<Volume>,
    /// Networks created before the first stage.
    pub networks: Vec<Network>,
}

impl Spec {
    /// Iterates over every step in stage order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.stages.iter().flat_map(|stage| &stage.steps)
    }
}

/// Steps scheduled together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage {
    /// Steps of the stage.
    pub steps: Vec<Step>,
}

/// A single container execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Step {
    /// Unique container name.
    pub name: String,
    /// Logical name as written in the pipeline.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub alias: String,
    /// Fully qualified image.
    pub image: String,
    /// Always pull the image.
    #[serde(skip_serializing_if = "is_false")]
    pub pull: bool,
    /// Runs in the background.
    #[serde(skip_serializing_if = "is_false")]
    pub detached: bool,
    /// Runs with extended privileges.
    #[serde(skip_serializing_if = "is_false")]
    pub privileged: bool,
    /// Failure does not fail the pipeline.
    #[serde(skip_serializing_if = "is_false")]
    pub err_ignore: bool,
    /// Runs while the pipeline is passing.
    pub on_success: bool,
    /// Runs once the pipeline is failing.
    pub on_failure: bool,
    /// Entrypoint override.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    /// Command override.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Working directory.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub working_dir: String,
    /// Environment variables.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Container labels.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Extra `/etc/hosts` entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_hosts: Vec<String>,
    /// Tmpfs mounts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tmpfs: Vec<String>,
    /// Custom DNS servers.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    /// Custom DNS search domains.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_search: Vec<String>,
    /// Network mode.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub network_mode: String,
    /// IPC mode.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ipc_mode: String,
    /// Namespaced kernel parameters.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sysctls: BTreeMap<String, String>,
    /// Volume mounts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeMapping>,
    /// Network attachments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<NetworkMapping>,
    /// Host devices.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceMapping>,
    /// Secrets exposed as environment variables.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<Secret>,
    /// Registry credentials used to pull the image.
    #[serde(skip_serializing_if = "AuthConfig::is_empty")]
    pub auth_config: AuthConfig,
    /// Files copied out after the step completes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<File>,
    /// Archives restored into the container before it starts.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub restore: Vec<Snapshot>,
    /// Memory limit in bytes.
    #[serde(skip_serializing_if = "is_zero")]
    pub mem_limit: i64,
    /// Memory plus swap limit in bytes.
    #[serde(skip_serializing_if = "is_zero")]
    pub mem_swap_limit: i64,
    /// Size of `/dev/shm` in bytes.
    #[serde(skip_serializing_if = "is_zero")]
    pub shm_size: i64,
    /// CPU CFS quota.
    #[serde(skip_serializing_if = "is_zero")]
    pub cpu_quota: i64,
    /// CPU shares.
    #[serde(skip_serializing_if = "is_zero")]
    pub cpu_shares: i64,
    /// CPUs in which execution is allowed.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cpu_set: String,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// A volume mounted into a step. Exactly one of `name` and `source` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeMapping {
    /// Named volume.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Host path.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub source: String,
    /// Path inside the container.
    pub target: String,
}

/// A network a step joins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkMapping {
    /// Network name.
    pub name: String,
    /// DNS aliases within the network.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

/// A host device exposed to a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceMapping {
    /// Host device path.
    pub source: String,
    /// Path inside the container.
    pub target: String,
}

/// A secret exposed to a step as an environment variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Secret {
    /// Environment variable name.
    pub name: String,
    /// Secret value.
    pub value: String,
    /// Mask the value in step output.
    pub mask: bool,
}

/// Registry credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Registry username.
    pub username: String,
    /// Registry password.
    pub password: String,
    /// Registry email.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl AuthConfig {
    /// Returns `true` if no credential field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_empty() && self.password.is_empty() && self.email.is_empty()
    }
}

/// A file exported from a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    /// Path inside the container.
    pub path: String,
    /// Mime type of the file.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mime: String,
}

/// An archive restored into a step before it starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Archive location, usually a data URL.
    pub source: String,
    /// Extraction root inside the container.
    pub target: String,
}

/// A top-level volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Volume {
    /// Volume name.
    pub name: String,
    /// Volume driver.
    pub driver: String,
}

/// A top-level network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    /// Network name.
    pub name: String,
    /// Network driver.
    pub driver: String,
}
