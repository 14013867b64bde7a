//! Build matrix expansion.
//!
//! The `matrix:` section either lists values per tag, expanded into their
//! cartesian product, or an explicit `include:` list of axes.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use tugboat_common::error::Result;

use crate::de::{scalar_to_string, string_map_from_value, strings_from_value};

/// Maximum number of axes calculated for one matrix.
pub const LIMIT_AXIS: usize = 25;

/// Maximum number of tags considered in one matrix.
pub const LIMIT_TAGS: usize = 10;

/// One permutation of the matrix: tag name to value.
pub type Axis = BTreeMap<String, String>;

#[derive(Deserialize, Default)]
#[serde(default)]
struct Document {
    matrix: Value,
}

/// Parses the matrix section of a pipeline document.
///
/// Returns `None` when the document declares no matrix.
///
/// # Errors
///
/// Returns an error if the text is not valid YAML or the matrix section
/// has the wrong shape.
pub fn parse_str(text: &str) -> Result<Option<Vec<Axis>>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let mut document: Value = serde_yaml::from_str(text)?;
    document.apply_merge()?;
    let document: Document = serde_yaml::from_value(document)?;
    let axes = expand(&document.matrix)?;
    Ok((!axes.is_empty()).then_some(axes))
}

/// Parses the matrix section of a pipeline file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn parse_file(path: &Path) -> Result<Option<Vec<Axis>>> {
    parse_str(&crate::parse::read(path)?)
}

/// Renders an axis as space-separated `key=value` pairs in key order.
#[must_use]
pub fn render(axis: &Axis) -> String {
    let mut out = String::new();
    for (key, value) in axis {
        if !out.is_empty() {
            out.push(' ');
        }
        let _ = write!(out, "{key}={value}");
    }
    out
}

fn expand(matrix: &Value) -> Result<Vec<Axis>> {
    let Value::Mapping(mapping) = matrix else {
        return Ok(Vec::new());
    };
    if let Some(include) = mapping.get("include") {
        let Value::Sequence(entries) = include else {
            return Err(invalid("matrix include must be a list"));
        };
        return entries
            .iter()
            .take(LIMIT_AXIS)
            .map(|entry| string_map_from_value(entry).map_err(invalid))
            .collect();
    }

    let mut tags: Vec<(String, Vec<String>)> = Vec::new();
    for (key, values) in mapping {
        let tag = scalar_to_string(key).ok_or_else(|| invalid("matrix tags must be strings"))?;
        let values = strings_from_value(values).map_err(invalid)?;
        if values.is_empty() {
            tracing::trace!(tag, "skipping matrix tag without values");
            continue;
        }
        tags.push((tag, values));
    }
    tags.truncate(LIMIT_TAGS);
    Ok(permutations(&tags))
}

fn permutations(tags: &[(String, Vec<String>)]) -> Vec<Axis> {
    if tags.is_empty() {
        return Vec::new();
    }
    let count = tags
        .iter()
        .try_fold(1_usize, |acc, (_, values)| acc.checked_mul(values.len()))
        .map_or(LIMIT_AXIS, |total| total.min(LIMIT_AXIS));
    (0..count)
        .map(|p| {
            let mut axis = Axis::new();
            let mut rest = p;
            for (tag, values) in tags.iter().rev() {
                let _ = axis.insert(tag.clone(), values[rest % values.len()].clone());
                rest /= values.len();
            }
            axis
        })
        .collect()
}

fn invalid(message: impl Into<String>) -> tugboat_common::error::TugboatError {
    tugboat_common::error::TugboatError::Config {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    const MATRIX: &str = "
matrix:
  go_version:
    - go1
    - go1.2
  python_version:
    - 3.2
    - 3.3
  django_version:
    - 1.7
    - 1.7.1
    - 1.7.2
  redis_version:
    - 2.6
    - 2.8
";

    const MATRIX_INCLUDE: &str = "
matrix:
  include:
    - go_version: 1.5
      python_version: 3.4
    - go_version: 1.6
      python_version: 3.4
";

    #[test]
    fn cartesian_product_is_unique() {
        let axes = parse_str(MATRIX).expect("parse").expect("matrix");
        assert_eq!(axes.len(), 24);
        let unique: BTreeSet<_> = axes.iter().map(render).collect();
        assert_eq!(unique.len(), 24);
        assert!(axes.iter().all(|axis| axis.len() == 4));
    }

    #[test]
    fn first_tag_varies_slowest() {
        let axes = parse_str(MATRIX).expect("parse").expect("matrix");
        assert_eq!(axes[0]["go_version"], "go1");
        assert_eq!(axes[11]["go_version"], "go1");
        assert_eq!(axes[12]["go_version"], "go1.2");
        assert_eq!(axes[0]["redis_version"], "2.6");
        assert_eq!(axes[1]["redis_version"], "2.8");
    }

    #[test]
    fn empty_matrix_is_none() {
        assert!(parse_str("").expect("parse").is_none());
        assert!(parse_str("pipeline: {}").expect("parse").is_none());
    }

    #[test]
    fn include_list_is_taken_verbatim() {
        let axes = parse_str(MATRIX_INCLUDE).expect("parse").expect("matrix");
        assert_eq!(axes.len(), 2);
        assert_eq!(axes[0]["go_version"], "1.5");
        assert_eq!(axes[1]["go_version"], "1.6");
        assert_eq!(axes[0]["python_version"], "3.4");
        assert_eq!(axes[1]["python_version"], "3.4");
    }

    #[test]
    fn axis_count_is_capped() {
        let axes = parse_str("matrix:\n  a: [1, 2, 3, 4, 5, 6]\n  b: [1, 2, 3, 4, 5, 6]\n")
            .expect("parse")
            .expect("matrix");
        assert_eq!(axes.len(), LIMIT_AXIS);
    }

    #[test]
    fn oversized_matrix_is_capped_without_overflow() {
        let values = (0..100).map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
        let text: String = std::iter::once("matrix:\n".to_string())
            .chain((0..10).map(|t| format!("  tag{t}: [{values}]\n")))
            .collect();
        let axes = parse_str(&text).expect("parse").expect("matrix");
        assert_eq!(axes.len(), LIMIT_AXIS);
        assert!(axes.iter().all(|axis| axis.len() == LIMIT_TAGS));
        assert_eq!(axes[0]["tag9"], "0");
        assert_eq!(axes[24]["tag9"], "24");
        assert!(axes.iter().all(|axis| axis["tag0"] == "0"));
    }

    #[test]
    fn render_sorts_keys() {
        let axis: Axis = [("b", "2"), ("a", "1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(render(&axis), "a=1 b=2");
    }
}
