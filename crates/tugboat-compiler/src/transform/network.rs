//! Extra networks attached to every step.
//!
//! Touches: `networks`.

use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container};

use super::Transform;
use crate::spec::{NetworkMapping, Step};

/// Attaches each named network to the step without aliases.
pub fn networks(names: Vec<String>) -> impl Transform {
    move |step: &mut Step, _: &Container, _: &Config| -> Result<()> {
        for name in &names {
            step.networks.push(NetworkMapping {
                name: name.clone(),
                aliases: Vec::new(),
            });
        }
        Ok(())
    }
}
