//! Pipeline compiler.
//!
//! Turns a parsed [`Config`] into a [`Spec`]: one stage for the clone
//! step, one for services, and one per pipeline group. Every step is
//! copied from its container, run through the transform list, filtered
//! against the trigger [`Metadata`], and finally namespaced.

use std::collections::BTreeMap;
use std::sync::Arc;

use tugboat_common::constants::{
    CLONE_IMAGE, CLONE_IMAGE_LINUX_ARM, CLONE_IMAGE_LINUX_ARM64, CLONE_IMAGE_WINDOWS,
    CLONE_STEP_NAME, DEFAULT_RESOURCE_NAME, ENV_STEP, NETWORK_DRIVER_BRIDGE, NETWORK_DRIVER_NAT,
    PLATFORM_LINUX_ARM, PLATFORM_LINUX_ARM64, PLATFORM_WINDOWS_AMD64, SPEC_VERSION,
    VOLUME_DRIVER_LOCAL,
};
use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container, ParamValue};

use crate::builder::CompilerBuilder;
use crate::image::expand_image;
use crate::namespace::{self, TokenSource};
use crate::spec::{
    DeviceMapping, File, Network, NetworkMapping, Spec, Stage, Step, Volume, VolumeMapping,
};
use crate::transform::Transform;

/// Trigger metadata used to decide which steps run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Git reference, e.g. `refs/heads/main`.
    pub git_ref: String,
    /// Repository full name.
    pub repo: String,
    /// Target platform.
    pub platform: String,
    /// Deployment environment.
    pub environment: String,
    /// Triggering event.
    pub event: String,
    /// Git branch.
    pub branch: String,
    /// Matrix axis of this build.
    pub matrix: BTreeMap<String, String>,
}

/// Compiles pipelines into runtime specs.
///
/// A compiler is immutable once built and may be shared between threads.
pub struct Compiler {
    pub(crate) metadata: Metadata,
    pub(crate) clone: bool,
    pub(crate) transforms: Vec<Box<dyn Transform>>,
    pub(crate) tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("metadata", &self.metadata)
            .field("clone", &self.clone)
            .field("transforms", &self.transforms.len())
            .field("tokens", &self.tokens)
            .finish()
    }
}

impl Compiler {
    /// Starts building a compiler with the built-in transforms.
    #[must_use]
    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::new()
    }

    /// Returns the trigger metadata steps are filtered against.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Compiles `config` into a namespaced runtime spec.
    ///
    /// # Errors
    ///
    /// Returns an error if a transform fails, for example when a build
    /// script archive cannot be written, or if namespacing produces
    /// duplicate resource names.
    pub fn compile(&self, config: &Config) -> Result<Spec> {
        tracing::info!(
            pipeline = %config.name,
            platform = %config.platform,
            groups = config.pipeline.len(),
            services = config.services.len(),
            "compiling pipeline"
        );
        let mut spec = Spec {
            version: SPEC_VERSION,
            ..Spec::default()
        };
        declare_resources(&mut spec, config);

        if self.clone && !config.clone.disable {
            let container = clone_container(config);
            let step = self.compile_step(&container, config, false)?;
            spec.stages.push(Stage { steps: vec![step] });
        }

        let mut services = Vec::new();
        for container in &config.services {
            let step = self.compile_step(container, config, true)?;
            if self.skip(container) {
                continue;
            }
            services.push(step);
        }
        if !services.is_empty() {
            spec.stages.push(Stage { steps: services });
        }

        for group in &config.pipeline {
            let mut steps = Vec::new();
            for container in group {
                let step = self.compile_step(container, config, false)?;
                if self.skip(container) {
                    continue;
                }
                steps.push(step);
            }
            if !steps.is_empty() {
                spec.stages.push(Stage { steps });
            }
        }

        let token = self.tokens.token();
        namespace::apply(&mut spec, &token)?;
        tracing::info!(
            stages = spec.stages.len(),
            steps = spec.steps().count(),
            token = %token,
            "compiled pipeline"
        );
        Ok(spec)
    }

    fn compile_step(&self, container: &Container, config: &Config, service: bool) -> Result<Step> {
        let mut step = copy_container(container);
        if service {
            step.detached = true;
        }
        for transform in &self.transforms {
            transform.apply(&mut step, container, config)?;
        }
        Ok(step)
    }

    fn skip(&self, container: &Container) -> bool {
        let skip = !is_selected(container, &self.metadata);
        if skip {
            tracing::debug!(step = %container.name, "step excluded by its when block");
        }
        skip
    }
}

/// Returns `true` if the container's `when` block accepts `metadata`.
#[must_use]
pub fn is_selected(container: &Container, metadata: &Metadata) -> bool {
    let when = &container.constraints;
    when.platform.matches(&metadata.platform)
        && when.environment.matches(&metadata.environment)
        && when.event.matches(&metadata.event)
        && when.branch.matches(&metadata.branch)
        && when.repo.matches(&metadata.repo)
        && when.git_ref.matches(&metadata.git_ref)
        && when.matrix.matches(&metadata.matrix)
}

fn declare_resources(spec: &mut Spec, config: &Config) {
    if !config.networks.contains_key(DEFAULT_RESOURCE_NAME) {
        let driver = if config.platform == PLATFORM_WINDOWS_AMD64 {
            NETWORK_DRIVER_NAT
        } else {
            NETWORK_DRIVER_BRIDGE
        };
        spec.networks.push(Network {
            name: DEFAULT_RESOURCE_NAME.to_string(),
            driver: driver.to_string(),
        });
    }
    if !config.volumes.contains_key(DEFAULT_RESOURCE_NAME) {
        spec.volumes.push(Volume {
            name: DEFAULT_RESOURCE_NAME.to_string(),
            driver: VOLUME_DRIVER_LOCAL.to_string(),
        });
    }
    spec.networks
        .extend(config.networks.iter().map(|(name, network)| Network {
            name: name.clone(),
            driver: network.driver.clone(),
        }));
    spec.volumes
        .extend(config.volumes.iter().map(|(name, volume)| Volume {
            name: name.clone(),
            driver: volume.driver.clone(),
        }));
}

fn clone_container(config: &Config) -> Container {
    if let Some(custom) = &config.clone.container {
        return custom.clone();
    }
    let image = match config.platform.as_str() {
        PLATFORM_LINUX_ARM => CLONE_IMAGE_LINUX_ARM,
        PLATFORM_LINUX_ARM64 => CLONE_IMAGE_LINUX_ARM64,
        PLATFORM_WINDOWS_AMD64 => CLONE_IMAGE_WINDOWS,
        _ => CLONE_IMAGE,
    };
    let mut container = Container::new(CLONE_STEP_NAME, image);
    if config.clone.depth > 0 {
        let _ = container
            .params
            .insert("depth".to_string(), ParamValue::Integer(config.clone.depth));
    }
    container
}

/// Copies the fields a step inherits directly from its container.
fn copy_container(container: &Container) -> Step {
    let mut environment = container.environment.clone();
    let _ = environment.insert(ENV_STEP.to_string(), container.name.clone());
    let status = &container.constraints.status;

    let mut step = Step {
        name: container.name.clone(),
        image: expand_image(&container.image),
        pull: container.pull,
        detached: container.detached,
        privileged: container.privileged,
        err_ignore: container.err_ignore,
        on_success: status.matches("success"),
        on_failure: !status.is_empty() && status.matches("failure"),
        entrypoint: container.entrypoint.clone(),
        command: container.command.clone(),
        environment,
        labels: container.labels.clone(),
        extra_hosts: container.extra_hosts.clone(),
        tmpfs: container.tmpfs.clone(),
        dns: container.dns.clone(),
        dns_search: container.dns_search.clone(),
        network_mode: container.network_mode.clone(),
        ipc_mode: container.ipc_mode.clone(),
        sysctls: container.sysctls.clone(),
        ..Step::default()
    };

    step.networks.push(NetworkMapping {
        name: DEFAULT_RESOURCE_NAME.to_string(),
        aliases: vec![container.name.clone()],
    });
    if let Some(coverage) = &container.reports.coverage {
        step.exports.push(File {
            path: coverage.source.clone(),
            mime: coverage.format.clone(),
        });
    }
    step.volumes
        .extend(container.volumes.iter().map(|mount| {
            if mount.source.starts_with('/') {
                VolumeMapping {
                    name: String::new(),
                    source: mount.source.clone(),
                    target: mount.destination.clone(),
                }
            } else {
                VolumeMapping {
                    name: mount.source.clone(),
                    source: String::new(),
                    target: mount.destination.clone(),
                }
            }
        }));
    step.networks
        .extend(container.networks.iter().map(|network| NetworkMapping {
            name: network.name.clone(),
            aliases: if network.aliases.is_empty() {
                vec![container.name.clone()]
            } else {
                network.aliases.clone()
            },
        }));
    step.devices.extend(container.devices.iter().filter_map(|device| {
        let parts: Vec<&str> = device.split(':').collect();
        match parts.as_slice() {
            [source, target] => Some(DeviceMapping {
                source: (*source).to_string(),
                target: (*target).to_string(),
            }),
            _ => {
                tracing::trace!(device = %device, "skipping malformed device mapping");
                None
            }
        }
    }));
    step
}
