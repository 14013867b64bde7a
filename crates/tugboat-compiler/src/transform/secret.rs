//! Repository secrets requested by containers.
//!
//! Touches: `secrets`, `environment`.

use std::collections::HashMap;

use tugboat_common::constants::ENV_SECRETS;
use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container};

use super::Transform;
use crate::image::match_image;
use crate::spec::{Secret, Step};

/// A secret available to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretValue {
    /// Secret name, matched case-insensitively.
    pub name: String,
    /// Secret value.
    pub value: String,
    /// Images allowed to receive the secret. Empty allows every image.
    pub images: Vec<String>,
}

impl SecretValue {
    /// Creates a secret available to every image.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            images: Vec::new(),
        }
    }
}

/// Injects each secret a container references, if the step image is
/// allowed to receive it.
pub fn secrets(secrets: Vec<SecretValue>) -> impl Transform {
    let lookup: HashMap<String, SecretValue> = secrets
        .into_iter()
        .map(|secret| (secret.name.to_lowercase(), secret))
        .collect();

    move |step: &mut Step, container: &Container, _: &Config| -> Result<()> {
        let mut injected = Vec::new();
        for reference in &container.secrets {
            let Some(secret) = lookup.get(&reference.source.to_lowercase()) else {
                tracing::trace!(step = %step.name, secret = %reference.source, "secret not found");
                continue;
            };
            if !secret.images.is_empty() && !match_image(&step.image, &secret.images) {
                tracing::debug!(step = %step.name, secret = %reference.source, "image not allowed to receive secret");
                continue;
            }
            injected.push(reference.target.clone());
            step.secrets.push(Secret {
                name: reference.target.to_uppercase(),
                value: secret.value.clone(),
                mask: true,
            });
        }
        if !injected.is_empty() {
            let _ = step
                .environment
                .insert(ENV_SECRETS.to_string(), injected.join(","));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tugboat_yaml::container::SecretRef;

    use super::*;

    fn run(image: &str, source: &str, target: &str, secret: SecretValue) -> Step {
        let container = Container {
            secrets: vec![SecretRef {
                source: source.into(),
                target: target.into(),
            }],
            ..Container::new("build", image)
        };
        let mut step = Step {
            image: crate::image::expand_image(image),
            ..Step::default()
        };
        secrets(vec![secret])
            .apply(&mut step, &container, &Config::default())
            .expect("apply");
        step
    }

    fn restricted(images: &[&str]) -> SecretValue {
        SecretValue {
            images: images.iter().map(ToString::to_string).collect(),
            ..SecretValue::new("password", "correct-horse-battery-staple")
        }
    }

    #[test]
    fn secret_injection_table() {
        let cases: &[(&str, &str, &str, SecretValue, bool)] = &[
            ("golang", "password", "password", SecretValue::new("password", "x"), true),
            ("golang", "PASSWORD", "password", SecretValue::new("password", "x"), true),
            ("golang", "password", "password", SecretValue::new("PASSWORD", "x"), true),
            ("golang", "password", "docker_password", SecretValue::new("password", "x"), true),
            ("golang", "username", "username", SecretValue::new("password", "x"), false),
            ("golang", "password", "password", restricted(&["node"]), false),
            ("golang:1.10", "password", "password", restricted(&["node", "golang"]), true),
        ];
        for (image, source, target, secret, matched) in cases {
            let step = run(image, source, target, secret.clone());
            if !matched {
                assert!(step.secrets.is_empty(), "{source} should not be injected into {image}");
                assert!(!step.environment.contains_key("CI_SECRETS"));
                continue;
            }
            assert_eq!(step.secrets.len(), 1, "{source} should be injected into {image}");
            assert_eq!(step.secrets[0].name, target.to_uppercase());
            assert_eq!(step.secrets[0].value, secret.value);
            assert!(step.secrets[0].mask);
            assert_eq!(step.environment.get("CI_SECRETS").map(String::as_str), Some(*target));
        }
    }

    #[test]
    fn injected_targets_are_listed_in_order() {
        let container = Container {
            secrets: vec![
                SecretRef {
                    source: "docker_username".into(),
                    target: "docker_username".into(),
                },
                SecretRef {
                    source: "missing".into(),
                    target: "missing".into(),
                },
                SecretRef {
                    source: "docker_password".into(),
                    target: "password".into(),
                },
            ],
            ..Container::new("publish", "plugins/docker")
        };
        let mut step = Step::default();
        secrets(vec![
            SecretValue::new("docker_username", "octocat"),
            SecretValue::new("docker_password", "secret"),
        ])
        .apply(&mut step, &container, &Config::default())
        .expect("apply");
        assert_eq!(
            step.environment.get("CI_SECRETS").map(String::as_str),
            Some("docker_username,password")
        );
        assert_eq!(step.secrets[1].name, "PASSWORD");
    }
}
