//! Shared workspace volume and working directory.
//!
//! Touches: `working_dir`, `volumes`, `environment`.

use std::sync::LazyLock;

use regex::Regex;
use tugboat_common::constants::{
    DEFAULT_RESOURCE_NAME, ENV_WORKSPACE, ENV_WORKSPACE_BASE, PLATFORM_WINDOWS_AMD64,
};
use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container};

use super::Transform;
use crate::spec::{Step, VolumeMapping};

static WINDOWS_DRIVE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^([a-zA-Z]):\\(.+)").ok());

/// Mounts the workspace and sets the working directory of every step.
///
/// The pipeline's own workspace settings take precedence over `base` and
/// `path`. Detached steps without commands keep their image's working
/// directory.
pub fn workspace(base: String, path: String) -> impl Transform {
    move |step: &mut Step, container: &Container, config: &Config| -> Result<()> {
        let base = if config.workspace.base.is_empty() {
            base.as_str()
        } else {
            config.workspace.base.as_str()
        };
        let path = if config.workspace.path.is_empty() {
            path.as_str()
        } else {
            config.workspace.path.as_str()
        };
        let full = join(&[base, path]);

        if !(container.commands.is_empty() && step.detached) {
            step.working_dir = if config.platform == PLATFORM_WINDOWS_AMD64 {
                normalize_windows(&full)
            } else {
                full.clone()
            };
        }
        if !step.volumes.iter().any(|v| v.name == DEFAULT_RESOURCE_NAME) {
            step.volumes.push(VolumeMapping {
                name: DEFAULT_RESOURCE_NAME.to_string(),
                source: String::new(),
                target: base.to_string(),
            });
        }
        let _ = step.environment.insert(ENV_WORKSPACE.to_string(), full);
        let _ = step
            .environment
            .insert(ENV_WORKSPACE_BASE.to_string(), base.to_string());
        Ok(())
    }
}

/// Derives the workspace path from a repository link: `src/<host>/<path>`,
/// or `src` when the link cannot be parsed.
#[must_use]
pub fn path_from_url(link: &str) -> String {
    let Some((scheme, rest)) = link.split_once("://") else {
        let first = link.split('/').next().unwrap_or_default();
        if first.contains(':') {
            return "src".to_string();
        }
        return join(&["src", link]);
    };
    if scheme.is_empty() || rest.contains(char::is_whitespace) {
        return "src".to_string();
    }
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (authority, path) = rest.split_at(rest.find('/').unwrap_or(rest.len()));
    let host = authority.rsplit_once('@').map_or(authority, |(_, host)| host);
    let host = strip_port(host);
    join(&["src", host, path])
}

fn strip_port(host: &str) -> &str {
    if let Some(inner) = host.strip_prefix('[') {
        return inner.split(']').next().unwrap_or_default();
    }
    host.split(':').next().unwrap_or_default()
}

/// Rewrites `c:\path` into the backslash-rooted `\c\path` form.
#[must_use]
pub fn normalize_windows(path: &str) -> String {
    let captures = WINDOWS_DRIVE.as_ref().and_then(|re| re.captures(path));
    match captures {
        Some(c) => format!(r"\{}\{}", &c[1], &c[2]),
        None => path.to_string(),
    }
}

/// Joins slash-separated path elements, skipping empty ones, and
/// collapses `.`, `..` and repeated separators.
fn join(parts: &[&str]) -> String {
    let joined = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        return String::new();
    }
    let rooted = joined.starts_with('/');
    let mut out: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if out.last().is_some_and(|s| *s != "..") {
                    let _ = out.pop();
                } else if !rooted {
                    out.push("..");
                }
            }
            s => out.push(s),
        }
    }
    let body = out.join("/");
    match (rooted, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}
