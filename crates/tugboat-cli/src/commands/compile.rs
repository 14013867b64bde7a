//! `tug compile`: Compile a pipeline file into the runtime spec.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use tugboat_common::config::TugboatConfig;
use tugboat_compiler::transform::registry::Registry;
use tugboat_compiler::transform::secret::SecretValue;
use tugboat_compiler::{Compiler, Metadata};
use tugboat_linter::Linter;

/// Arguments for the `compile` command.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Path to the pipeline file.
    pub source: PathBuf,

    /// Write the compiled JSON to a file instead of stdout.
    pub target: Option<PathBuf>,

    /// Host configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Compile in trusted mode, allowing privileged settings.
    #[arg(long)]
    pub trusted: bool,

    /// Skip the synthesized clone step.
    #[arg(long)]
    pub no_clone: bool,

    /// Volume mounted into every step (`name:target` or `/host:target`).
    #[arg(long = "volume")]
    pub volumes: Vec<String>,

    /// Network attached to every step.
    #[arg(long = "network")]
    pub networks: Vec<String>,

    /// Environment variable added to every step.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub environ: Vec<(String, String)>,

    /// Image run as a privileged container. Replaces the configured list.
    #[arg(long = "privileged", value_name = "IMAGE")]
    pub privileged: Vec<String>,

    /// Workspace base path.
    #[arg(long)]
    pub base: Option<String>,

    /// Workspace path relative to the base.
    #[arg(long)]
    pub path: Option<String>,

    /// Triggering event.
    #[arg(long, value_parser = ["push", "pull_request", "tag", "deployment"])]
    pub event: Option<String>,

    /// Repository full name.
    #[arg(long, value_name = "octocat/hello-world")]
    pub repo: Option<String>,

    /// Git commit branch.
    #[arg(long = "git-branch", value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Git commit reference.
    #[arg(long = "git-ref", value_name = "REF")]
    pub git_ref: Option<String>,

    /// Target deployment environment.
    #[arg(long = "deploy-to", value_name = "ENVIRONMENT")]
    pub deploy_to: Option<String>,

    /// Target platform.
    #[arg(long, value_name = "linux/amd64")]
    pub platform: Option<String>,

    /// Matrix axis value of this build.
    #[arg(long = "matrix", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub matrix: Vec<(String, String)>,

    /// Secret available to steps that request it.
    #[arg(long = "secret", value_name = "NAME=VALUE", value_parser = parse_key_value)]
    pub secrets: Vec<(String, String)>,

    /// Registry credentials.
    #[arg(long = "registry", value_name = "USER:PASSWORD@HOST", value_parser = parse_registry)]
    pub registries: Vec<Registry>,

    /// Netrc username.
    #[arg(long = "netrc-login", value_name = "TOKEN")]
    pub netrc_login: Option<String>,

    /// Netrc password.
    #[arg(long = "netrc-password", value_name = "PASSWORD")]
    pub netrc_password: Option<String>,

    /// Netrc machine.
    #[arg(long = "netrc-machine", value_name = "HOST")]
    pub netrc_machine: Option<String>,

    /// CPUs in which execution is allowed.
    #[arg(long = "cpu-set", value_name = "0,1")]
    pub cpu_set: Option<String>,

    /// CPU shares.
    #[arg(long = "cpu-shares")]
    pub cpu_shares: Option<i64>,

    /// CPU CFS quota.
    #[arg(long = "cpu-quota")]
    pub cpu_quota: Option<i64>,

    /// Memory limit, e.g. `1GB`.
    #[arg(long = "mem-limit", value_parser = parse_size)]
    pub mem_limit: Option<i64>,

    /// Memory plus swap limit, e.g. `2GB`.
    #[arg(long = "mem-swap-limit", value_parser = parse_size)]
    pub mem_swap_limit: Option<i64>,

    /// Size of `/dev/shm`, e.g. `64MB`.
    #[arg(long = "shmsize", value_parser = parse_size)]
    pub shm_size: Option<i64>,
}

fn parse_key_value(text: &str) -> Result<(String, String), String> {
    text.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{text}'"))
}

fn parse_registry(text: &str) -> Result<Registry, String> {
    text.parse().map_err(|e: tugboat_common::error::TugboatError| e.to_string())
}

fn parse_size(text: &str) -> Result<i64, String> {
    tugboat_common::units::parse_bytes(text).map_err(|e| e.to_string())
}

impl CompileArgs {
    /// Overlays the command-line flags on the host configuration.
    fn host_config(&self) -> anyhow::Result<TugboatConfig> {
        let mut config = match &self.config {
            Some(path) => TugboatConfig::load(path)?,
            None => TugboatConfig::default(),
        };
        config.trusted |= self.trusted;
        if self.no_clone {
            config.clone = false;
        }
        config.volumes.extend(self.volumes.iter().cloned());
        config.networks.extend(self.networks.iter().cloned());
        config.environment.extend(self.environ.iter().cloned());
        if !self.privileged.is_empty() {
            config.privileged.clone_from(&self.privileged);
        }
        if let Some(base) = &self.base {
            config.workspace_base.clone_from(base);
        }
        if let Some(path) = &self.path {
            config.workspace_path.clone_from(path);
        }
        let limits = &mut config.limits;
        if let Some(cpu_set) = &self.cpu_set {
            limits.cpu_set.clone_from(cpu_set);
        }
        limits.cpu_shares = self.cpu_shares.unwrap_or(limits.cpu_shares);
        limits.cpu_quota = self.cpu_quota.unwrap_or(limits.cpu_quota);
        limits.mem_limit = self.mem_limit.unwrap_or(limits.mem_limit);
        limits.mem_swap_limit = self.mem_swap_limit.unwrap_or(limits.mem_swap_limit);
        limits.shm_size = self.shm_size.unwrap_or(limits.shm_size);
        Ok(config)
    }

    fn metadata(&self) -> Metadata {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Metadata {
            git_ref: text(&self.git_ref),
            repo: text(&self.repo),
            platform: text(&self.platform),
            environment: text(&self.deploy_to),
            event: text(&self.event),
            branch: text(&self.branch),
            matrix: self.matrix.iter().cloned().collect::<BTreeMap<_, _>>(),
        }
    }
}

/// Executes the `compile` command.
///
/// The pipeline is linted before it is compiled, so a pipeline that
/// violates a lint rule produces no output.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be parsed, fails linting, or
/// the output cannot be written.
pub fn execute(args: CompileArgs) -> anyhow::Result<()> {
    let host = args.host_config()?;
    let config = tugboat_yaml::parse::parse_file(&args.source)?;
    Linter::with_defaults(host.trusted).lint(&config)?;

    let mut builder = Compiler::builder()
        .host_config(&host)
        .metadata(args.metadata())
        .registries(args.registries.clone())
        .secrets(
            args.secrets
                .iter()
                .map(|(name, value)| SecretValue::new(name, value))
                .collect(),
        );
    if let Some(machine) = &args.netrc_machine {
        builder = builder.netrc(
            machine,
            args.netrc_login.as_deref().unwrap_or_default(),
            args.netrc_password.as_deref().unwrap_or_default(),
        );
    }
    let spec = builder.build().compile(&config)?;
    tracing::info!(
        source = %args.source.display(),
        stages = spec.stages.len(),
        "compiled pipeline"
    );

    let json = crate::output::to_json(&spec)?;
    crate::output::write(args.target.as_deref(), &json)
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::commands::{Cli, Command};

    fn parse(args: &[&str]) -> CompileArgs {
        let cli = Cli::try_parse_from(args).expect("valid arguments");
        match cli.command {
            Command::Compile(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn flags_overlay_defaults() {
        let args = parse(&[
            "tug", "compile", "pipeline.yml", "--trusted", "--volume", "/tmp:/tmp",
            "--env", "GOPROXY=direct", "--base", "/go", "--mem-limit", "1GB",
            "--cpu-shares", "512",
        ]);
        let host = args.host_config().expect("host config");
        assert!(host.trusted);
        assert_eq!(host.volumes, vec!["/tmp:/tmp"]);
        assert_eq!(host.environment.get("GOPROXY").map(String::as_str), Some("direct"));
        assert_eq!(host.workspace_base, "/go");
        assert_eq!(host.privileged, vec!["plugins/docker"]);
        assert_eq!(host.limits.mem_limit, 1024 * 1024 * 1024);
        assert_eq!(host.limits.cpu_shares, 512);
    }

    #[test]
    fn metadata_from_flags() {
        let args = parse(&[
            "tug", "compile", "pipeline.yml", "--event", "push", "--git-branch", "main",
            "--deploy-to", "production", "--matrix", "GO_VERSION=1.11",
        ]);
        let metadata = args.metadata();
        assert_eq!(metadata.event, "push");
        assert_eq!(metadata.branch, "main");
        assert_eq!(metadata.environment, "production");
        assert_eq!(metadata.matrix.get("GO_VERSION").map(String::as_str), Some("1.11"));
    }

    #[test]
    fn invalid_flags_are_rejected() {
        for args in [
            &["tug", "compile", "p.yml", "--event", "merge"][..],
            &["tug", "compile", "p.yml", "--env", "NOVALUE"][..],
            &["tug", "compile", "p.yml", "--registry", "gcr.io"][..],
            &["tug", "compile", "p.yml", "--mem-limit", "lots"][..],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?} should be rejected");
        }
    }

    #[test]
    fn compile_writes_json_spec() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let source = dir.path().join("pipeline.yml");
        let target = dir.path().join("spec.json");
        std::fs::write(
            &source,
            "pipeline:\n  build:\n    image: golang\n    commands: [ go build ]\n",
        )
        .expect("write pipeline");
        let args = parse(&[
            "tug",
            "compile",
            source.to_str().expect("utf-8 path"),
            target.to_str().expect("utf-8 path"),
            "--no-clone",
        ]);
        execute(args).expect("compile");
        let json = std::fs::read_to_string(&target).expect("read spec");
        let spec: tugboat_compiler::Spec = serde_json::from_str(&json).expect("valid spec");
        assert_eq!(spec.stages.len(), 1);
        assert_eq!(spec.stages[0].steps[0].alias, "build");
    }

    #[test]
    fn lint_failure_prevents_output() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let source = dir.path().join("pipeline.yml");
        let target = dir.path().join("spec.json");
        std::fs::write(&source, "pipeline:\n  build:\n    image: golang\n    privileged: true\n")
            .expect("write pipeline");
        let args = parse(&[
            "tug",
            "compile",
            source.to_str().expect("utf-8 path"),
            target.to_str().expect("utf-8 path"),
        ]);
        let err = execute(args).expect_err("untrusted privileged step");
        assert!(err.to_string().contains("privileged mode"));
        assert!(!target.exists());
    }
}
