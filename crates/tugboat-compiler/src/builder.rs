//! Fluent API for configuring a [`Compiler`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tugboat_common::config::{ResourceLimits, TugboatConfig};
use tugboat_common::constants::{ENV_NETRC_MACHINE, ENV_NETRC_PASSWORD, ENV_NETRC_USERNAME};

use crate::compiler::{Compiler, Metadata};
use crate::namespace::{TokenSource, UuidTokenSource};
use crate::transform::proxy::{self, ProxyEnv};
use crate::transform::registry::{self, Registry};
use crate::transform::secret::{self, SecretValue};
use crate::transform::{
    Transform, command, env, limits, network, plugin, privilege, volume, workspace,
};

/// Builder for a [`Compiler`].
///
/// Plugin parameters, build scripts and proxy variables are always
/// applied first. Every other option appends one transform, applied in
/// the order the options were called.
pub struct CompilerBuilder {
    metadata: Metadata,
    clone: bool,
    proxy: ProxyEnv,
    transforms: Vec<Box<dyn Transform>>,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for CompilerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilerBuilder")
            .field("metadata", &self.metadata)
            .field("clone", &self.clone)
            .field("proxy", &self.proxy)
            .field("transforms", &self.transforms.len())
            .finish_non_exhaustive()
    }
}

impl Default for CompilerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerBuilder {
    /// Creates a builder, capturing the proxy variables of the current
    /// process.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: Metadata::default(),
            clone: true,
            proxy: ProxyEnv::from_process(),
            transforms: Vec::new(),
            tokens: Arc::new(UuidTokenSource),
        }
    }

    /// Sets the trigger metadata steps are filtered against.
    #[must_use]
    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Enables or disables the synthesized clone step.
    #[must_use]
    pub const fn clone_step(mut self, enabled: bool) -> Self {
        self.clone = enabled;
        self
    }

    /// Replaces the captured proxy variables.
    #[must_use]
    pub fn proxy(mut self, env: ProxyEnv) -> Self {
        self.proxy = env;
        self
    }

    /// Sets the namespace token source.
    #[must_use]
    pub fn token_source(mut self, tokens: impl TokenSource + 'static) -> Self {
        self.tokens = Arc::new(tokens);
        self
    }

    /// Appends a custom transform.
    #[must_use]
    pub fn transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    /// Mounts extra volumes (`name:target` or `/host:target`) into every
    /// step.
    #[must_use]
    pub fn volumes(self, mappings: Vec<String>) -> Self {
        self.transform(volume::volumes(mappings))
    }

    /// Attaches extra networks to every step.
    #[must_use]
    pub fn networks(self, names: Vec<String>) -> Self {
        self.transform(network::networks(names))
    }

    /// Adds registry credentials used to pull step images.
    #[must_use]
    pub fn registries(self, registries: Vec<Registry>) -> Self {
        self.transform(registry::registries(registries))
    }

    /// Makes secrets available to containers that request them.
    #[must_use]
    pub fn secrets(self, secrets: Vec<SecretValue>) -> Self {
        self.transform(secret::secrets(secrets))
    }

    /// Adds netrc credentials, installed by the build script.
    #[must_use]
    pub fn netrc(self, machine: &str, username: &str, password: &str) -> Self {
        let vars = [
            (ENV_NETRC_MACHINE, machine),
            (ENV_NETRC_USERNAME, username),
            (ENV_NETRC_PASSWORD, password),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        self.environ(vars)
    }

    /// Sets the default workspace base and path.
    #[must_use]
    pub fn workspace(self, base: impl Into<String>, path: impl Into<String>) -> Self {
        self.transform(workspace::workspace(base.into(), path.into()))
    }

    /// Sets the default workspace from the repository link, so the
    /// repository is cloned to `<base>/src/<host>/<path>`.
    #[must_use]
    pub fn workspace_from_url(self, base: impl Into<String>, link: &str) -> Self {
        self.workspace(base, workspace::path_from_url(link))
    }

    /// Runs matching plugin images as privileged containers.
    #[must_use]
    pub fn privileged(self, images: Vec<String>) -> Self {
        self.transform(privilege::privileged(images))
    }

    /// Adds environment variables to every step.
    #[must_use]
    pub fn environ(self, vars: BTreeMap<String, String>) -> Self {
        self.transform(env::environ(vars))
    }

    /// Applies resource limits to every step.
    #[must_use]
    pub fn limits(self, resources: ResourceLimits) -> Self {
        self.transform(limits::limits(resources))
    }

    /// Applies the host settings of `config`: clone, workspace,
    /// privileged images, volumes, networks, environment and limits.
    #[must_use]
    pub fn host_config(self, config: &TugboatConfig) -> Self {
        self.clone_step(config.clone)
            .workspace(config.workspace_base.clone(), config.workspace_path.clone())
            .privileged(config.privileged.clone())
            .volumes(config.volumes.clone())
            .networks(config.networks.clone())
            .environ(config.environment.clone())
            .limits(config.limits.clone())
    }

    /// Builds the compiler.
    #[must_use]
    pub fn build(self) -> Compiler {
        let mut transforms: Vec<Box<dyn Transform>> = Vec::with_capacity(self.transforms.len() + 3);
        transforms.push(Box::new(plugin::apply));
        transforms.push(Box::new(command::apply));
        transforms.push(Box::new(proxy::proxy(self.proxy)));
        transforms.extend(self.transforms);
        tracing::debug!(transforms = transforms.len(), clone = self.clone, "built compiler");
        Compiler {
            metadata: self.metadata,
            clone: self.clone,
            transforms,
            tokens: self.tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::FixedTokenSource;
    use crate::spec::Step;
    use tugboat_common::error::Result;
    use tugboat_yaml::{Config, Container};

    fn compile_one(builder: CompilerBuilder, text: &str) -> Step {
        let config = tugboat_yaml::parse::parse_str(text).expect("parse");
        let spec = builder
            .clone_step(false)
            .proxy(ProxyEnv::default())
            .token_source(FixedTokenSource("ns".into()))
            .build()
            .compile(&config)
            .expect("compile");
        spec.stages[0].steps[0].clone()
    }

    #[test]
    fn built_ins_run_before_options() {
        let step = compile_one(
            CompilerBuilder::new().transform(
                |step: &mut Step, _: &Container, _: &Config| -> Result<()> {
                    let seen = step.environment.contains_key("PLUGIN_CHANNEL");
                    let _ = step.environment.insert("SEEN_PLUGIN".into(), seen.to_string());
                    Ok(())
                },
            ),
            "pipeline:\n  p:\n    image: plugins/slack\n    channel: dev\n",
        );
        assert_eq!(step.environment.get("SEEN_PLUGIN").map(String::as_str), Some("true"));
    }

    #[test]
    fn options_apply_in_order() {
        let first = [("KEY".to_string(), "first".to_string())].into();
        let second = [("KEY".to_string(), "second".to_string())].into();
        let step = compile_one(
            CompilerBuilder::new().environ(first).environ(second),
            "pipeline:\n  p:\n    image: alpine\n",
        );
        assert_eq!(step.environment.get("KEY").map(String::as_str), Some("second"));
    }

    #[test]
    fn netrc_variables_are_injected() {
        let step = compile_one(
            CompilerBuilder::new().netrc("github.com", "octocat", "x-oauth-basic"),
            "pipeline:\n  p:\n    image: alpine\n",
        );
        assert_eq!(step.environment.get("CI_NETRC_MACHINE").map(String::as_str), Some("github.com"));
        assert_eq!(step.environment.get("CI_NETRC_USERNAME").map(String::as_str), Some("octocat"));
        assert_eq!(
            step.environment.get("CI_NETRC_PASSWORD").map(String::as_str),
            Some("x-oauth-basic")
        );
    }

    #[test]
    fn workspace_from_repository_link() {
        let step = compile_one(
            CompilerBuilder::new()
                .workspace_from_url("/go", "https://github.com/octocat/hello-world"),
            "pipeline:\n  p:\n    image: golang\n    commands: [ go build ]\n",
        );
        assert_eq!(step.working_dir, "/go/src/github.com/octocat/hello-world");
    }

    #[test]
    fn host_config_defaults() {
        let step = compile_one(
            CompilerBuilder::new().host_config(&TugboatConfig::default()),
            "pipeline:\n  p:\n    image: plugins/docker\n",
        );
        assert!(step.privileged);
        assert_eq!(step.working_dir, "/workspace");
        assert_eq!(step.volumes[0].name, "ns_default");
    }
}
