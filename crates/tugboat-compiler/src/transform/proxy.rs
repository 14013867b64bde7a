//! Proxy variables of the compiling process.
//!
//! Touches: `environment`.

use std::collections::BTreeMap;

use tugboat_common::constants::PROXY_VARIABLES;
use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container};

use super::Transform;
use crate::spec::Step;

/// Proxy settings captured once, keyed by lowercase variable name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyEnv {
    vars: BTreeMap<String, String>,
}

impl ProxyEnv {
    /// Captures the proxy variables of the current process.
    #[must_use]
    pub fn from_process() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Captures proxy variables through `lookup`, preferring the uppercase
    /// spelling of each variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut vars = BTreeMap::new();
        for name in PROXY_VARIABLES {
            let value = lookup(&name.to_uppercase())
                .filter(|v| !v.is_empty())
                .or_else(|| lookup(name))
                .filter(|v| !v.is_empty());
            if let Some(value) = value {
                let _ = vars.insert((*name).to_string(), value);
            }
        }
        Self { vars }
    }

    /// Returns `true` if no proxy variable was set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Writes both spellings of every captured variable into `env`.
    pub fn inject(&self, env: &mut BTreeMap<String, String>) {
        for (name, value) in &self.vars {
            let _ = env.insert(name.to_uppercase(), value.clone());
            let _ = env.insert(name.clone(), value.clone());
        }
    }
}

/// Injects the captured proxy variables into every step.
pub fn proxy(env: ProxyEnv) -> impl Transform {
    move |step: &mut Step, _: &Container, _: &Config| -> Result<()> {
        env.inject(&mut step.environment);
        Ok(())
    }
}
