//! Glob-based include/exclude constraints.
//!
//! A [`Constraint`] gates a single string attribute (branch, event, ...),
//! a [`ConstraintMap`] gates a key/value set (the matrix axis), and
//! [`Constraints`] bundles every dimension of a container's `when` block.
//!
//! Patterns are path globs: `*` stays inside one `/`-delimited segment and
//! `**` spans any number of segments. Exclusions are evaluated first and
//! always win.

use std::collections::BTreeMap;

use globset::{GlobBuilder, GlobMatcher};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use crate::de::{scalar_to_string, string_map_from_value, strings_from_value};

/// A glob pattern compiled once at construction.
///
/// Patterns that are not valid globs are compared literally.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    matcher: Option<GlobMatcher>,
}

impl Pattern {
    /// Compiles `source` into a pattern.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let matcher = match GlobBuilder::new(&source).literal_separator(true).build() {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(e) => {
                tracing::trace!(
                    pattern = %source,
                    error = %e,
                    "invalid glob pattern, comparing literally"
                );
                None
            }
        };
        Self { source, matcher }
    }

    /// Returns the pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if `value` matches the pattern.
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.matcher
            .as_ref()
            .map_or_else(|| self.source == value, |m| m.is_match(value))
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

fn compile_all(sources: Vec<String>) -> Vec<Pattern> {
    sources.into_iter().map(Pattern::new).collect()
}

fn compile_map(sources: BTreeMap<String, String>) -> BTreeMap<String, Pattern> {
    sources
        .into_iter()
        .map(|(key, source)| (key, Pattern::new(source)))
        .collect()
}

/// Include/exclude rule over a single string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Constraint {
    /// Creates a constraint from include and exclude patterns.
    #[must_use]
    pub fn new<I, E>(include: I, exclude: E) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            include: include.into_iter().map(Pattern::new).collect(),
            exclude: exclude.into_iter().map(Pattern::new).collect(),
        }
    }

    /// Patterns of which at least one must match, when non-empty.
    #[must_use]
    pub fn include(&self) -> &[Pattern] {
        &self.include
    }

    /// Patterns of which none may match.
    #[must_use]
    pub fn exclude(&self) -> &[Pattern] {
        &self.exclude
    }

    /// Returns `true` if neither include nor exclude patterns are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Returns `true` if the value satisfies the constraint.
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        if self.excludes(value) {
            return false;
        }
        self.include.is_empty() || self.includes(value)
    }

    /// Returns `true` if the constraint is empty or any value satisfies it.
    #[must_use]
    pub fn matches_any<S: AsRef<str>>(&self, values: &[S]) -> bool {
        self.is_empty() || values.iter().any(|v| self.matches(v.as_ref()))
    }

    /// Returns `true` if the value matches an include pattern.
    #[must_use]
    pub fn includes(&self, value: &str) -> bool {
        self.include.iter().any(|p| p.is_match(value))
    }

    /// Returns `true` if the value matches an exclude pattern.
    #[must_use]
    pub fn excludes(&self, value: &str) -> bool {
        self.exclude.iter().any(|p| p.is_match(value))
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        if let Value::Mapping(mapping) = value {
            let mut constraint = Self::default();
            for (key, val) in mapping {
                match scalar_to_string(key).as_deref() {
                    Some("include") => constraint.include = compile_all(strings_from_value(val)?),
                    Some("exclude") => constraint.exclude = compile_all(strings_from_value(val)?),
                    other => return Err(format!("unknown constraint key: {other:?}")),
                }
            }
            return Ok(constraint);
        }
        Ok(Self {
            include: compile_all(strings_from_value(value)?),
            exclude: Vec::new(),
        })
    }
}

impl<'de> Deserialize<'de> for Constraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}

/// Include/exclude rule over a key/value set.
///
/// Both sides are conjunctive: inclusion needs every include key present
/// and matching, and exclusion applies only when every exclude key is
/// present and matching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintMap {
    include: BTreeMap<String, Pattern>,
    exclude: BTreeMap<String, Pattern>,
}

impl ConstraintMap {
    /// Key patterns that must all match.
    #[must_use]
    pub const fn include(&self) -> &BTreeMap<String, Pattern> {
        &self.include
    }

    /// Key patterns that exclude the set when they all match.
    #[must_use]
    pub const fn exclude(&self) -> &BTreeMap<String, Pattern> {
        &self.exclude
    }

    /// Returns `true` if neither include nor exclude entries are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Returns `true` if the key/value set satisfies the constraint.
    #[must_use]
    pub fn matches(&self, params: &BTreeMap<String, String>) -> bool {
        if self.is_empty() {
            return true;
        }
        if !self.exclude.is_empty() && all_match(&self.exclude, params) {
            return false;
        }
        all_match(&self.include, params)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        let Value::Mapping(mapping) = value else {
            return match value {
                Value::Null => Ok(Self::default()),
                other => Err(format!("expected a mapping, got {other:?}")),
            };
        };
        let keyed = mapping.keys().any(|k| {
            matches!(scalar_to_string(k).as_deref(), Some("include" | "exclude"))
        });
        if !keyed {
            return Ok(Self {
                include: compile_map(string_map_from_value(value)?),
                exclude: BTreeMap::new(),
            });
        }
        let mut constraint = Self::default();
        for (key, val) in mapping {
            match scalar_to_string(key).as_deref() {
                Some("include") => constraint.include = compile_map(string_map_from_value(val)?),
                Some("exclude") => constraint.exclude = compile_map(string_map_from_value(val)?),
                other => return Err(format!("unknown constraint key: {other:?}")),
            }
        }
        Ok(constraint)
    }
}

fn all_match(patterns: &BTreeMap<String, Pattern>, params: &BTreeMap<String, String>) -> bool {
    patterns
        .iter()
        .all(|(key, pattern)| params.get(key).is_some_and(|value| pattern.is_match(value)))
}

impl<'de> Deserialize<'de> for ConstraintMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}

/// The `when` block of a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Constraints {
    /// Target platform, e.g. `linux/amd64`.
    pub platform: Constraint,
    /// Deployment environment, e.g. `production`.
    pub environment: Constraint,
    /// Triggering event, e.g. `push` or `tag`.
    pub event: Constraint,
    /// Git branch.
    pub branch: Constraint,
    /// Repository full name, e.g. `octocat/hello-world`.
    pub repo: Constraint,
    /// Git reference, e.g. `refs/tags/v1.0.0`.
    #[serde(rename = "ref")]
    pub git_ref: Constraint,
    /// Build status, used for success/failure gating.
    pub status: Constraint,
    /// Matrix axis.
    pub matrix: ConstraintMap,
}
