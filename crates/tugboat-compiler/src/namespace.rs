//! Per-compile resource namespacing.
//!
//! Many pipelines share one container host, so every compiled step,
//! volume and network is prefixed with a random token drawn once per
//! compile call.

use std::collections::BTreeSet;

use tugboat_common::error::{Result, TugboatError};
use tugboat_common::slug;

use crate::spec::Spec;

/// Source of namespace tokens.
///
/// Implementations must be safe to call from concurrent compiles and
/// should return a fresh, slug-safe token on every call.
pub trait TokenSource: Send + Sync + std::fmt::Debug {
    /// Returns a new namespace token.
    fn token(&self) -> String;
}

/// Draws tokens from random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokenSource;

/// Length of tokens produced by [`UuidTokenSource`].
pub const TOKEN_LEN: usize = 16;

impl TokenSource for UuidTokenSource {
    fn token(&self) -> String {
        let mut token = uuid::Uuid::new_v4().simple().to_string();
        token.truncate(TOKEN_LEN);
        token
    }
}

/// Always returns the same token. Useful for reproducible output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedTokenSource(pub String);

impl TokenSource for FixedTokenSource {
    fn token(&self) -> String {
        self.0.clone()
    }
}

/// Rewrites every resource name in `spec` under `token`.
///
/// Each step keeps its logical name as its alias and is renamed to
/// `<token><stage><step>_<name>`. Named step volumes and step networks
/// become `<token>_<name>`, and so do the declared volumes and networks.
///
/// # Errors
///
/// Returns [`TugboatError::Compile`] if two steps, two declared volumes
/// or two declared networks end up with the same name. Stage and step
/// indices are concatenated without a separator, so stage 1 step 11 and
/// stage 11 step 1 collide when they share a name.
pub fn apply(spec: &mut Spec, token: &str) -> Result<()> {
    for (i, stage) in spec.stages.iter_mut().enumerate() {
        for (ii, step) in stage.steps.iter_mut().enumerate() {
            step.alias.clone_from(&step.name);
            step.name = slug::make(&format!("{token}{i}{ii}_{}", step.name));

            for volume in step.volumes.iter_mut().filter(|v| !v.name.is_empty()) {
                volume.name = format!("{token}_{}", volume.name);
            }
            for network in &mut step.networks {
                network.name = format!("{token}_{}", network.name);
            }
        }
    }
    for volume in &mut spec.volumes {
        volume.name = slug::make(&format!("{token}_{}", volume.name));
    }
    for network in &mut spec.networks {
        network.name = slug::make(&format!("{token}_{}", network.name));
    }
    ensure_distinct("step", spec.steps().map(|s| s.name.as_str()))?;
    ensure_distinct("volume", spec.volumes.iter().map(|v| v.name.as_str()))?;
    ensure_distinct("network", spec.networks.iter().map(|n| n.name.as_str()))?;
    tracing::debug!(token = %token, "namespaced compiled resources");
    Ok(())
}

fn ensure_distinct<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(TugboatError::Compile {
                message: format!("duplicate {kind} name after namespacing: {name}"),
            });
        }
    }
    Ok(())
}
