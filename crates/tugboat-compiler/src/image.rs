//! Image reference naming.
//!
//! References follow the `[domain/]path[:tag][@digest]` grammar. Anything
//! that does not parse is passed through untouched.

use std::sync::LazyLock;

use regex::Regex;
use tugboat_common::constants::{
    DEFAULT_REGISTRY, DEFAULT_REPO_PREFIX, DEFAULT_TAG, LEGACY_DEFAULT_REGISTRY,
};

static REFERENCE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let component = r"[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*";
    let label = r"(?:[a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9-]*[a-zA-Z0-9])";
    let domain = format!(r"{label}(?:\.{label})*(?::[0-9]+)?");
    let tag = r"[\w][\w.-]{0,127}";
    let digest = r"[A-Za-z][A-Za-z0-9]*(?:[-_+.][A-Za-z][A-Za-z0-9]*)*:[0-9a-fA-F]{32,}";
    let pattern = format!(
        r"^((?:{domain}/)?{component}(?:/{component})*)(?::({tag}))?(?:@({digest}))?$"
    );
    Regex::new(&pattern).ok()
});

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reference<'a> {
    name: &'a str,
    tag: Option<&'a str>,
    digest: Option<&'a str>,
}

impl<'a> Reference<'a> {
    fn parse(text: &'a str) -> Option<Self> {
        let captures = REFERENCE.as_ref()?.captures(text)?;
        let name = captures.get(1)?.as_str();
        if name.len() > 255 {
            return None;
        }
        Some(Self {
            name,
            tag: captures.get(2).map(|m| m.as_str()),
            digest: captures.get(3).map(|m| m.as_str()),
        })
    }

    /// Registry host, if the first path component names one.
    fn hostname(&self) -> Option<&'a str> {
        let (first, _) = self.name.split_once('/')?;
        let is_host = first.contains('.') || first.contains(':') || first == "localhost";
        is_host.then_some(first)
    }
}

fn strip_defaults(name: &str) -> &str {
    let name = name
        .strip_prefix(LEGACY_DEFAULT_REGISTRY)
        .and_then(|rest| rest.strip_prefix('/'))
        .or_else(|| {
            name.strip_prefix(DEFAULT_REGISTRY)
                .and_then(|rest| rest.strip_prefix('/'))
        })
        .unwrap_or(name);
    name.strip_prefix(DEFAULT_REPO_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(name)
}

/// Returns the fully qualified form of an image: always tagged, with the
/// default registry and `library/` prefix removed.
///
/// ```
/// use tugboat_compiler::image::expand_image;
///
/// assert_eq!(expand_image("golang"), "golang:latest");
/// assert_eq!(expand_image("docker.io/library/golang:1.11"), "golang:1.11");
/// ```
#[must_use]
pub fn expand_image(image: &str) -> String {
    let Some(reference) = Reference::parse(image) else {
        tracing::trace!(image, "unparsable image reference, keeping as is");
        return image.to_string();
    };
    let mut expanded = strip_defaults(reference.name).to_string();
    match (reference.tag, reference.digest) {
        (Some(tag), _) => {
            expanded.push(':');
            expanded.push_str(tag);
        }
        (None, None) => {
            expanded.push(':');
            expanded.push_str(DEFAULT_TAG);
        }
        (None, Some(_)) => {}
    }
    if let Some(digest) = reference.digest {
        expanded.push('@');
        expanded.push_str(digest);
    }
    expanded
}

/// Returns the short form of an image: no default registry, no
/// `library/` prefix, no tag or digest.
#[must_use]
pub fn trim_image(image: &str) -> String {
    let stripped = strip_defaults(image);
    Reference::parse(stripped).map_or_else(|| stripped.to_string(), |r| r.name.to_string())
}

/// Returns `true` if `image` matches any of `candidates`, ignoring tags.
#[must_use]
pub fn match_image<S: AsRef<str>>(image: &str, candidates: &[S]) -> bool {
    let image = trim_image(image);
    candidates
        .iter()
        .any(|candidate| trim_image(candidate.as_ref()) == image)
}

/// Returns `true` if the image is pulled from `hostname`.
///
/// Images without a registry host resolve to the default registry.
#[must_use]
pub fn match_hostname(image: &str, hostname: &str) -> bool {
    let Some(reference) = Reference::parse(image) else {
        return false;
    };
    let host = match reference.hostname() {
        None | Some(DEFAULT_REPO_PREFIX | LEGACY_DEFAULT_REGISTRY) => DEFAULT_REGISTRY,
        Some(host) => host,
    };
    host == hostname
}
