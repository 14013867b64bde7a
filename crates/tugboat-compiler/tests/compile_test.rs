//! Integration tests for the pipeline compiler.
//!
//! Pipelines are parsed from YAML and compiled end to end, the way the
//! CLI does after linting.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::BTreeSet;

use proptest::prelude::*;
use tugboat_common::error::TugboatError;
use tugboat_compiler::namespace::{self, FixedTokenSource};
use tugboat_compiler::spec::{Network, Stage, Step, Volume};
use tugboat_compiler::transform::proxy::ProxyEnv;
use tugboat_compiler::transform::secret::SecretValue;
use tugboat_compiler::{Compiler, CompilerBuilder, Metadata, Spec};
use tugboat_yaml::parse;

fn builder() -> CompilerBuilder {
    Compiler::builder()
        .proxy(ProxyEnv::default())
        .workspace("/workspace", "src/github.com/octocat/hello-world")
}

fn compile(compiler: &Compiler, text: &str) -> Spec {
    let config = parse::parse_str(text).expect("should parse pipeline");
    compiler.compile(&config).expect("should compile")
}

fn aliases(spec: &Spec) -> Vec<Vec<String>> {
    spec.stages
        .iter()
        .map(|stage| stage.steps.iter().map(|s| s.alias.clone()).collect())
        .collect()
}

const PIPELINE: &str = "
pipeline:
  build:
    image: golang
    group: build
    commands:
      - go build
  vet:
    image: golang
    group: build
    commands:
      - go vet
    when:
      branch:
        exclude: [ release/* ]
  publish:
    image: plugins/docker
    repo: octocat/hello-world
    when:
      branch: release/*
  notify:
    image: plugins/slack
    channel: dev
services:
  database:
    image: mysql
volumes:
  cache: {}
";

// ── Constraint filtering ──

#[test]
fn excluded_step_is_dropped_from_its_stage() {
    let compiler = builder()
        .metadata(Metadata {
            branch: "release/1.0".into(),
            ..Metadata::default()
        })
        .build();
    let spec = compile(&compiler, PIPELINE);
    assert_eq!(
        aliases(&spec),
        vec![
            vec!["clone"],
            vec!["database"],
            vec!["build"],
            vec!["publish"],
            vec!["notify"],
        ]
    );
}

#[test]
fn stage_is_absent_when_every_step_is_excluded() {
    let compiler = builder()
        .metadata(Metadata {
            branch: "main".into(),
            ..Metadata::default()
        })
        .build();
    let spec = compile(&compiler, PIPELINE);
    assert_eq!(
        aliases(&spec),
        vec![
            vec!["clone"],
            vec!["database"],
            vec!["build", "vet"],
            vec!["notify"],
        ]
    );
}

// ── Step contents ──

#[test]
fn plugin_parameters_become_environment() {
    let spec = compile(&builder().build(), PIPELINE);
    let notify = spec.steps().find(|s| s.alias == "notify").expect("notify step");
    assert_eq!(notify.environment.get("PLUGIN_CHANNEL").map(String::as_str), Some("dev"));
    assert_eq!(notify.environment.get("CI_STEP").map(String::as_str), Some("notify"));
}

#[test]
fn commands_become_a_build_script() {
    let spec = compile(&builder().build(), PIPELINE);
    let build = spec.steps().find(|s| s.alias == "build").expect("build step");
    assert_eq!(build.entrypoint, vec!["/bin/sh"]);
    assert_eq!(build.command, vec!["/bin/_tugboat"]);
    assert_eq!(build.restore.len(), 1);
    assert_eq!(build.working_dir, "/workspace/src/github.com/octocat/hello-world");
}

#[test]
fn privileged_plugin_is_promoted() {
    let compiler = builder()
        .privileged(vec!["plugins/docker".into()])
        .metadata(Metadata {
            branch: "release/1.0".into(),
            ..Metadata::default()
        })
        .build();
    let spec = compile(&compiler, PIPELINE);
    let publish = spec.steps().find(|s| s.alias == "publish").expect("publish step");
    assert!(publish.privileged);
    let build = spec.steps().find(|s| s.alias == "build").expect("build step");
    assert!(!build.privileged);
}

#[test]
fn every_step_joins_the_default_network() {
    let spec = compile(&builder().token_source(FixedTokenSource("t".into())).build(), PIPELINE);
    for step in spec.steps() {
        assert_eq!(step.networks[0].name, "t_default");
        assert_eq!(step.networks[0].aliases, vec![step.alias.clone()]);
    }
}

// ── Secrets ──

const SECRET_PIPELINE: &str = "
pipeline:
  build:
    image: golang
    secrets: [ password ]
    commands: [ go build ]
";

#[test]
fn unrestricted_secret_is_injected_masked() {
    let compiler = builder()
        .secrets(vec![SecretValue::new("PASSWORD", "correct-horse-battery-staple")])
        .build();
    let spec = compile(&compiler, SECRET_PIPELINE);
    let build = spec.steps().find(|s| s.alias == "build").expect("build step");
    assert_eq!(build.secrets.len(), 1);
    assert_eq!(build.secrets[0].name, "PASSWORD");
    assert_eq!(build.secrets[0].value, "correct-horse-battery-staple");
    assert!(build.secrets[0].mask);
    assert_eq!(build.environment.get("CI_SECRETS").map(String::as_str), Some("password"));
}

#[test]
fn restricted_secret_is_withheld() {
    let compiler = builder()
        .secrets(vec![SecretValue {
            images: vec!["plugins/docker".into()],
            ..SecretValue::new("password", "correct-horse-battery-staple")
        }])
        .build();
    let spec = compile(&compiler, SECRET_PIPELINE);
    let build = spec.steps().find(|s| s.alias == "build").expect("build step");
    assert!(build.secrets.is_empty());
    assert!(!build.environment.contains_key("CI_SECRETS"));
}

// ── Namespacing ──

fn strip_names(mut spec: Spec) -> Spec {
    for stage in &mut spec.stages {
        for step in &mut stage.steps {
            step.name.clear();
            for volume in &mut step.volumes {
                volume.name.clear();
            }
            for network in &mut step.networks {
                network.name.clear();
            }
        }
    }
    for volume in &mut spec.volumes {
        volume.name.clear();
    }
    for network in &mut spec.networks {
        network.name.clear();
    }
    spec
}

#[test]
fn recompiling_differs_only_in_names() {
    let compiler = builder().build();
    let first = compile(&compiler, PIPELINE);
    let second = compile(&compiler, PIPELINE);
    assert_ne!(first.stages[0].steps[0].name, second.stages[0].steps[0].name);
    assert_eq!(strip_names(first), strip_names(second));
}

fn resource_names(spec: &Spec) -> BTreeSet<String> {
    spec.steps()
        .map(|s| s.name.clone())
        .chain(spec.volumes.iter().map(|v| v.name.clone()))
        .chain(spec.networks.iter().map(|n| n.name.clone()))
        .collect()
}

#[test]
fn concurrent_compiles_use_disjoint_names() {
    let compiler = builder().build();
    let (left, right) = std::thread::scope(|scope| {
        let left = scope.spawn(|| compile(&compiler, PIPELINE));
        let right = scope.spawn(|| compile(&compiler, PIPELINE));
        (left.join().unwrap(), right.join().unwrap())
    });
    let left = resource_names(&left);
    let right = resource_names(&right);
    assert!(!left.is_empty());
    assert!(left.is_disjoint(&right));
}

#[test]
fn compiled_spec_serializes_to_json() {
    let spec = compile(&builder().token_source(FixedTokenSource("t".into())).build(), PIPELINE);
    let json = serde_json::to_string(&spec).expect("serialize");
    let back: Spec = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, spec);
}

fn synthetic_spec(stages: &[Vec<String>], volumes: &BTreeSet<String>) -> Spec {
    Spec {
        version: 1,
        stages: stages
            .iter()
            .map(|names| Stage {
                steps: names
                    .iter()
                    .map(|name| Step {
                        name: name.clone(),
                        ..Step::default()
                    })
                    .collect(),
            })
            .collect(),
        volumes: volumes
            .iter()
            .map(|name| Volume {
                name: name.clone(),
                driver: "local".into(),
            })
            .collect(),
        networks: volumes
            .iter()
            .map(|name| Network {
                name: name.clone(),
                driver: "bridge".into(),
            })
            .collect(),
    }
}

#[test]
fn colliding_step_names_fail_to_compile() {
    let mut text = String::from("steps:\n");
    for i in 0..11 {
        text.push_str(&format!("  - {{ name: a{i}, image: alpine, group: a }}\n"));
    }
    text.push_str("  - { name: x, image: alpine, group: a }\n");
    for i in 0..9 {
        text.push_str(&format!("  - {{ name: s{i}, image: alpine }}\n"));
    }
    text.push_str("  - { name: y, image: alpine, group: z }\n");
    text.push_str("  - { name: x, image: alpine, group: z }\n");

    let config = parse::parse_str(&text).expect("should parse pipeline");
    let compiler = builder().token_source(FixedTokenSource("tok".into())).build();
    let err = compiler.compile(&config).expect_err("duplicate step names");
    assert!(matches!(err, TugboatError::Compile { .. }), "{err}");
}

fn has_index_collision(stages: &[Vec<String>], token: &str) -> bool {
    let mut seen = BTreeSet::new();
    stages
        .iter()
        .enumerate()
        .flat_map(|(i, names)| {
            names
                .iter()
                .enumerate()
                .map(move |(ii, name)| format!("{token}{i}{ii}_{name}"))
        })
        .any(|name| !seen.insert(name))
}

proptest! {
    #[test]
    fn namespaced_names_are_distinct(
        stages in prop::collection::vec(prop::collection::vec("[a-z][a-z0-9]{0,7}", 1..15), 1..15),
        volumes in prop::collection::btree_set("[a-z][a-z0-9]{0,7}", 0..6),
        token in "[a-z0-9]{16}",
    ) {
        let mut spec = synthetic_spec(&stages, &volumes);
        let collides = has_index_collision(&stages, &token);
        let result = namespace::apply(&mut spec, &token);
        prop_assert_eq!(result.is_err(), collides);
        if collides {
            return Ok(());
        }

        let logical_names: Vec<&String> = stages.iter().flatten().collect();
        let steps: Vec<&Step> = spec.steps().collect();
        for (step, logical) in steps.iter().zip(&logical_names) {
            prop_assert_eq!(&step.alias, *logical);
        }
        let step_names: BTreeSet<&str> = steps.iter().map(|s| s.name.as_str()).collect();
        prop_assert_eq!(step_names.len(), steps.len());

        let volume_names: BTreeSet<&str> = spec.volumes.iter().map(|v| v.name.as_str()).collect();
        prop_assert_eq!(volume_names.len(), spec.volumes.len());
        let network_names: BTreeSet<&str> = spec.networks.iter().map(|n| n.name.as_str()).collect();
        prop_assert_eq!(network_names.len(), spec.networks.len());
    }
}
