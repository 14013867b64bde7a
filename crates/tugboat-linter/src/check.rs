//! Individual lint checks.
//!
//! Structural checks always run. Trust-gated checks are no-ops when the
//! caller declares the pipeline trusted.

use tugboat_common::constants::{NETWORK_DRIVER_BRIDGE, VOLUME_DRIVER_LOCAL};
use tugboat_common::error::{Result, TugboatError};
use tugboat_common::slug;
use tugboat_yaml::Config;
use tugboat_yaml::container::{Container, VolumeMount};

/// A single lint rule over a pipeline.
pub trait Check: Send + Sync {
    /// Returns an error describing the violated rule, if any.
    ///
    /// # Errors
    ///
    /// Returns a lint or untrusted error when the rule is violated.
    fn check(&self, config: &Config) -> Result<()>;
}

impl<F> Check for F
where
    F: Fn(&Config) -> Result<()> + Send + Sync,
{
    fn check(&self, config: &Config) -> Result<()> {
        self(config)
    }
}

/// Lifts a per-container rule into a [`Check`] applied to the clone
/// container, every pipeline container, and every service.
pub fn each_container<F>(rule: F) -> impl Check
where
    F: Fn(&Config, &Container) -> Result<()> + Send + Sync,
{
    move |config: &Config| {
        config
            .clone
            .container
            .iter()
            .chain(config.pipeline_containers())
            .chain(&config.services)
            .try_for_each(|container| rule(config, container))
    }
}

/// The pipeline must declare at least one container.
///
/// # Errors
///
/// Returns a lint error when the pipeline is empty.
pub fn pipeline(config: &Config) -> Result<()> {
    if config.is_pipeline_empty() {
        return Err(TugboatError::lint("Invalid or missing pipeline section"));
    }
    Ok(())
}

/// Every container needs an image.
///
/// # Errors
///
/// Returns a lint error when the image is empty.
pub fn image(_: &Config, container: &Container) -> Result<()> {
    if container.image.is_empty() {
        return Err(TugboatError::lint("Invalid or missing image"));
    }
    Ok(())
}

/// Script containers cannot also be plugins or override the entrypoint
/// or command.
///
/// # Errors
///
/// Returns a lint error naming the conflicting attribute.
pub fn commands(_: &Config, container: &Container) -> Result<()> {
    if container.commands.is_empty() {
        return Ok(());
    }
    if !container.params.is_empty() {
        return Err(TugboatError::lint(
            "Cannot configure both commands and plugin attributes",
        ));
    }
    if !container.entrypoint.is_empty() {
        return Err(TugboatError::lint(
            "Cannot configure both commands and entrypoint attributes",
        ));
    }
    if !container.command.is_empty() {
        return Err(TugboatError::lint(
            "Cannot configure both commands and command attributes",
        ));
    }
    Ok(())
}

/// Only services may override the image entrypoint.
///
/// # Errors
///
/// Returns a lint error for a non-service entrypoint override.
pub fn entrypoint(config: &Config, container: &Container) -> Result<()> {
    if !is_service(config, container) && !container.entrypoint.is_empty() {
        return Err(TugboatError::lint("Cannot override container entrypoint"));
    }
    Ok(())
}

/// Only services may override the image command.
///
/// # Errors
///
/// Returns a lint error for a non-service command override.
pub fn command(config: &Config, container: &Container) -> Result<()> {
    if !is_service(config, container) && !container.command.is_empty() {
        return Err(TugboatError::lint("Cannot override container command"));
    }
    Ok(())
}

/// Container attributes reserved for trusted pipelines.
pub fn trusted(trusted: bool) -> impl Check {
    each_container(move |config, container| {
        if trusted {
            return Ok(());
        }
        untrusted_action(config, container).map_or(Ok(()), |action| {
            Err(TugboatError::Untrusted { action })
        })
    })
}

fn untrusted_action(config: &Config, container: &Container) -> Option<&'static str> {
    if container.privileged {
        return Some("use privileged mode");
    }
    if container.shm_size != 0 {
        return Some("override shm_size");
    }
    if !container.dns.is_empty() {
        return Some("use custom dns");
    }
    if !container.dns_search.is_empty() {
        return Some("use dns_search");
    }
    if !container.devices.is_empty() {
        return Some("use devices");
    }
    if !container.extra_hosts.is_empty() {
        return Some("use extra_hosts");
    }
    if !container.network_mode.is_empty() && container.network_mode != NETWORK_DRIVER_BRIDGE {
        return Some("use network_mode");
    }
    if !container.ipc_mode.is_empty() {
        return Some("use ipc_mode");
    }
    if !container.sysctls.is_empty() {
        return Some("use sysctls");
    }
    if !container.networks.is_empty() {
        return Some("use networks");
    }
    if container
        .volumes
        .iter()
        .any(|volume| !is_data_volume(config, volume))
    {
        return Some("use volumes");
    }
    None
}

/// Top-level volumes must use the local driver unless trusted.
pub fn volumes(trusted: bool) -> impl Check {
    move |config: &Config| {
        if trusted {
            return Ok(());
        }
        let custom = config
            .volumes
            .values()
            .any(|v| !(v.driver.is_empty() || v.driver == VOLUME_DRIVER_LOCAL));
        if custom {
            return Err(TugboatError::Untrusted {
                action: "define custom volumes",
            });
        }
        Ok(())
    }
}

/// Top-level networks cannot be declared unless trusted.
pub fn networks(trusted: bool) -> impl Check {
    move |config: &Config| {
        if !trusted && !config.networks.is_empty() {
            return Err(TugboatError::Untrusted {
                action: "define custom networks",
            });
        }
        Ok(())
    }
}

/// Returns `true` if the mount source is a slug naming a declared
/// top-level volume.
#[must_use]
pub fn is_data_volume(config: &Config, volume: &VolumeMount) -> bool {
    slug::is_slug(&volume.source) && config.volumes.contains_key(&volume.source)
}

/// Returns `true` if the container is detached or is one of the
/// pipeline's services.
///
/// Service membership is decided by identity, not by name, so a pipeline
/// step sharing a service's name is not a service.
#[must_use]
pub fn is_service(config: &Config, container: &Container) -> bool {
    container.detached
        || config
            .services
            .iter()
            .any(|service| std::ptr::eq(service, container))
}
