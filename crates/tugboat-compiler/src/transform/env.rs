//! Fixed environment variables added to every step.
//!
//! Touches: `environment`.

use std::collections::BTreeMap;

use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container};

use super::Transform;
use crate::spec::Step;

/// Adds every non-empty variable to the step environment, overwriting
/// existing values.
pub fn environ(vars: BTreeMap<String, String>) -> impl Transform {
    move |step: &mut Step, _: &Container, _: &Config| -> Result<()> {
        for (key, value) in &vars {
            if !value.is_empty() {
                let _ = step.environment.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }
}
