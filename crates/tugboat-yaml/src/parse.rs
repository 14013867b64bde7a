//! Parsing pipeline documents from text and files.

use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;
use tugboat_common::error::{Result, TugboatError};

use crate::config::Config;

/// Parses a single pipeline document.
///
/// Anchors and aliases are resolved and `<<` merge keys are applied
/// before the document is interpreted. An empty document yields the
/// default configuration.
///
/// # Errors
///
/// Returns an error if the text is not valid YAML or does not describe
/// a pipeline.
pub fn parse_str(text: &str) -> Result<Config> {
    if text.trim().is_empty() {
        return Ok(Config::default());
    }
    from_value(serde_yaml::from_str(text)?)
}

/// Parses a single pipeline document from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse.
pub fn parse_file(path: &Path) -> Result<Config> {
    tracing::debug!(path = %path.display(), "parsing pipeline file");
    parse_str(&read(path)?)
}

/// Parses a stream of `---` separated pipeline documents.
///
/// # Errors
///
/// Returns an error if any document fails to parse.
pub fn parse_multi_str(text: &str) -> Result<Vec<Config>> {
    let mut configs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        configs.push(from_value(Value::deserialize(document)?)?);
    }
    if configs.is_empty() {
        configs.push(Config::default());
    }
    tracing::debug!(documents = configs.len(), "parsed pipeline stream");
    Ok(configs)
}

/// Parses a stream of pipeline documents from a file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any document fails to
/// parse.
pub fn parse_multi_file(path: &Path) -> Result<Vec<Config>> {
    tracing::debug!(path = %path.display(), "parsing pipeline stream file");
    parse_multi_str(&read(path)?)
}

pub(crate) fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| TugboatError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn from_value(mut value: Value) -> Result<Config> {
    if value.is_null() {
        return Ok(Config::default());
    }
    value.apply_merge()?;
    Ok(serde_yaml::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::Constraint;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(parse_str("").expect("parse"), Config::default());
        assert_eq!(parse_str("\n  \n").expect("parse"), Config::default());
    }

    #[test]
    fn anchors_and_merge_keys() {
        let config = parse_str(
            "
_slack: &SLACK
  image: plugins/slack
pipeline:
  notify_fail: *SLACK
  notify_success:
    << : *SLACK
    when:
      status: success
",
        )
        .expect("parse");
        let containers: Vec<_> = config.pipeline_containers().collect();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].name, "notify_fail");
        assert_eq!(containers[0].image, "plugins/slack");
        assert_eq!(containers[1].image, "plugins/slack");
        assert_eq!(
            containers[1].constraints.status,
            Constraint::new(["success"], Vec::<String>::new())
        );
        assert!(containers[1].params.is_empty());
    }

    #[test]
    fn multi_document_stream() {
        let configs = parse_multi_str(
            "
pipeline:
  a: { image: alpine }
---
pipeline:
  b: { image: alpine }
  c: { image: alpine }
",
        )
        .expect("parse");
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[1].pipeline.len(), 2);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let err = parse_str("pipeline: [ unclosed").unwrap_err();
        assert!(matches!(err, TugboatError::Yaml { .. }));
    }

    #[test]
    fn parse_file_reports_missing_path() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let err = parse_file(&dir.path().join("nope.yml")).unwrap_err();
        assert!(matches!(err, TugboatError::Io { .. }));
    }
}
