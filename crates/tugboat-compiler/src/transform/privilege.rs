//! Privileged mode for allowlisted plugin images.
//!
//! Touches: `privileged`, `entrypoint`, `command`.

use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container};

use super::Transform;
use crate::image::match_image;
use crate::spec::Step;

/// Runs allowlisted images privileged, ignoring tags.
///
/// Steps built from shell commands are never promoted, and promoted steps
/// lose any entrypoint or command override.
pub fn privileged(images: Vec<String>) -> impl Transform {
    move |step: &mut Step, container: &Container, _: &Config| -> Result<()> {
        if !container.commands.is_empty() {
            return Ok(());
        }
        if match_image(&container.image, &images) {
            tracing::debug!(step = %step.name, image = %container.image, "promoting step to privileged");
            step.privileged = true;
            step.entrypoint.clear();
            step.command.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promote(container: &Container) -> Step {
        let mut step = Step {
            entrypoint: vec!["/bin/sh".into()],
            command: vec!["-c".into()],
            ..Step::default()
        };
        privileged(vec!["plugins/docker".into(), "plugins/ecr".into()])
            .apply(&mut step, container, &Config::default())
            .expect("apply");
        step
    }

    #[test]
    fn allowlisted_images_are_promoted() {
        for image in ["plugins/docker", "plugins/docker:latest", "plugins/ecr:1"] {
            let step = promote(&Container::new("publish", image));
            assert!(step.privileged, "{image} should be privileged");
            assert!(step.entrypoint.is_empty());
            assert!(step.command.is_empty());
        }
    }

    #[test]
    fn other_images_are_untouched() {
        let step = promote(&Container::new("build", "golang"));
        assert!(!step.privileged);
        assert_eq!(step.entrypoint, vec!["/bin/sh"]);
    }

    #[test]
    fn commands_prevent_promotion() {
        let container = Container {
            commands: vec!["docker build .".into()],
            ..Container::new("publish", "plugins/docker")
        };
        let step = promote(&container);
        assert!(!step.privileged);
        assert_eq!(step.command, vec!["-c"]);
    }
}
