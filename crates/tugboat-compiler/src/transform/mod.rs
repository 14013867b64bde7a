//! Step transforms.
//!
//! Each transform mutates a [`Step`] given the container it was copied
//! from and the pipeline it belongs to. The compiler applies the built-in
//! transforms first (plugin parameters, build script, proxy variables)
//! and then the configured ones in the order they were added. Later
//! transforms may overwrite fields set by earlier ones.

pub mod command;
pub mod env;
pub mod limits;
pub mod network;
pub mod plugin;
pub mod privilege;
pub mod proxy;
pub mod registry;
pub mod secret;
pub mod volume;
pub mod workspace;

use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container};

use crate::spec::Step;

/// A mutation applied to every compiled step.
pub trait Transform: Send + Sync {
    /// Applies the transform to `step`.
    ///
    /// # Errors
    ///
    /// Returns an error only for internal failures such as an archive
    /// that cannot be written.
    fn apply(&self, step: &mut Step, container: &Container, config: &Config) -> Result<()>;
}

impl<F> Transform for F
where
    F: Fn(&mut Step, &Container, &Config) -> Result<()> + Send + Sync,
{
    fn apply(&self, step: &mut Step, container: &Container, config: &Config) -> Result<()> {
        self(step, container, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_transforms() {
        let transform = |step: &mut Step, container: &Container, _: &Config| -> Result<()> {
            step.name = format!("{}-x", container.name);
            Ok(())
        };
        let mut step = Step::default();
        transform
            .apply(&mut step, &Container::new("build", "golang"), &Config::default())
            .expect("apply");
        assert_eq!(step.name, "build-x");
    }
}
