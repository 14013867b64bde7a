//! Host-level configuration model for the Tugboat compiler.
//!
//! These settings describe the build host, not the pipeline: which images
//! may run privileged, where the workspace lives, and which limits apply
//! to every step. The CLI loads them from an optional YAML file and
//! overlays command-line flags on top.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TugboatError};

/// Root configuration for the Tugboat compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TugboatConfig {
    /// Whether pipelines are compiled in trusted mode.
    pub trusted: bool,
    /// Whether a clone step is synthesized.
    pub clone: bool,
    /// Workspace base directory mounted into every step.
    pub workspace_base: String,
    /// Workspace path relative to the base.
    pub workspace_path: String,
    /// Images promoted to privileged execution.
    pub privileged: Vec<String>,
    /// Extra volumes (`name:target` or `/host:target`) mounted into every step.
    pub volumes: Vec<String>,
    /// Extra networks attached to every step.
    pub networks: Vec<String>,
    /// Environment variables added to every step.
    pub environment: BTreeMap<String, String>,
    /// Resource limits applied to every step.
    pub limits: ResourceLimits,
}

impl Default for TugboatConfig {
    fn default() -> Self {
        Self {
            trusted: false,
            clone: true,
            workspace_base: crate::constants::DEFAULT_WORKSPACE_BASE.to_string(),
            workspace_path: String::new(),
            privileged: crate::constants::DEFAULT_PRIVILEGED_IMAGES
                .iter()
                .map(ToString::to_string)
                .collect(),
            volumes: Vec::new(),
            networks: Vec::new(),
            environment: BTreeMap::new(),
            limits: ResourceLimits::default(),
        }
    }
}

impl TugboatConfig {
    /// Loads the configuration from a YAML file.
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading host configuration");
        let content = std::fs::read_to_string(path).map_err(|e| TugboatError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_yaml::from_str(&content)?)
    }
}

/// Container resource limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Memory limit in bytes.
    pub mem_limit: i64,
    /// Memory plus swap limit in bytes.
    pub mem_swap_limit: i64,
    /// Size of `/dev/shm` in bytes.
    pub shm_size: i64,
    /// CPU CFS quota in microseconds.
    pub cpu_quota: i64,
    /// CPU shares (relative weight).
    pub cpu_shares: i64,
    /// CPUs in which execution is allowed (`0-3`, `0,1`).
    pub cpu_set: String,
}
