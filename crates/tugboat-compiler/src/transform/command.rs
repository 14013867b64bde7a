//! Build script generation for steps with shell commands.
//!
//! Touches: `entrypoint`, `command`, `restore` (POSIX) or `environment`
//! (Windows).

use tugboat_common::constants::{
    DEFAULT_SHELL, ENV_SCRIPT, PLATFORM_WINDOWS_AMD64, SCRIPT_PATH,
};
use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container};

use crate::script::{posix, windows};
use crate::spec::{Snapshot, Step};

/// Replaces the step entrypoint and command with a generated build script.
///
/// Containers without commands, or with an explicit entrypoint or
/// command, are left untouched.
///
/// # Errors
///
/// Returns an error if the script archive cannot be written.
pub fn apply(step: &mut Step, container: &Container, config: &Config) -> Result<()> {
    if container.commands.is_empty()
        || !container.entrypoint.is_empty()
        || !container.command.is_empty()
    {
        return Ok(());
    }
    if config.platform == PLATFORM_WINDOWS_AMD64 {
        apply_windows(step, container);
        return Ok(());
    }

    let shell = if container.shell.is_empty() {
        DEFAULT_SHELL
    } else {
        container.shell.as_str()
    };
    let script = posix::generate(&container.commands);
    let archive = posix::archive(&script)?;
    step.entrypoint = vec![shell.to_string()];
    step.command = vec![SCRIPT_PATH.to_string()];
    step.restore.push(Snapshot {
        source: posix::data_url(&archive),
        target: "/".to_string(),
    });
    tracing::debug!(step = %step.name, commands = container.commands.len(), "generated posix build script");
    Ok(())
}

fn apply_windows(step: &mut Step, container: &Container) {
    let script = windows::generate(&container.commands);
    step.entrypoint = windows::ENTRYPOINT.iter().map(ToString::to_string).collect();
    step.command = vec![windows::COMMAND.to_string()];
    let _ = step
        .environment
        .insert(ENV_SCRIPT.to_string(), windows::encode(&script));
    let _ = step
        .environment
        .insert("HOME".to_string(), windows::HOME.to_string());
    let _ = step
        .environment
        .insert("SHELL".to_string(), windows::SHELL.to_string());
    tracing::debug!(step = %step.name, commands = container.commands.len(), "generated powershell build script");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script_container() -> Container {
        Container {
            commands: vec!["go build".into(), "go test".into()],
            ..Container::new("build", "golang")
        }
    }

    #[test]
    fn posix_script_is_restored_and_invoked() {
        let mut step = Step::default();
        apply(&mut step, &script_container(), &Config::default()).expect("apply");
        assert_eq!(step.entrypoint, vec!["/bin/sh"]);
        assert_eq!(step.command, vec!["/bin/_tugboat"]);
        assert_eq!(step.restore.len(), 1);
        assert_eq!(step.restore[0].target, "/");
        assert!(step.restore[0].source.starts_with("data:application/octet-stream;base64,"));
        assert!(!step.environment.contains_key("CI_SCRIPT"));
    }

    #[test]
    fn custom_shell_is_used() {
        let container = Container {
            shell: "/bin/bash".into(),
            ..script_container()
        };
        let mut step = Step::default();
        apply(&mut step, &container, &Config::default()).expect("apply");
        assert_eq!(step.entrypoint, vec!["/bin/bash"]);
    }

    #[test]
    fn windows_script_travels_in_environment() {
        let config = Config {
            platform: "windows/amd64".into(),
            ..Config::default()
        };
        let mut step = Step::default();
        apply(&mut step, &script_container(), &config).expect("apply");
        assert_eq!(step.entrypoint[0], "powershell");
        assert_eq!(step.command, vec![windows::COMMAND]);
        assert_eq!(
            step.environment.get("CI_SCRIPT"),
            Some(&windows::encode(&windows::generate(&script_container().commands)))
        );
        assert_eq!(step.environment.get("HOME").map(String::as_str), Some(r"c:\root"));
        assert!(step.restore.is_empty());
    }

    #[test]
    fn no_commands_no_script() {
        let mut step = Step::default();
        apply(&mut step, &Container::new("publish", "plugins/docker"), &Config::default())
            .expect("apply");
        assert!(step.entrypoint.is_empty());
        assert!(step.restore.is_empty());
    }
}
