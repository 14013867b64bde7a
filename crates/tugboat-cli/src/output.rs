//! Output helpers for CLI commands.

use std::path::Path;

use serde::Serialize;

/// Serializes `value` as tab-indented JSON.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

/// Writes `content` to `target`, or to stdout when no target is given.
///
/// # Errors
///
/// Returns an error if the target file cannot be written.
pub fn write(target: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match target {
        Some(path) => {
            std::fs::write(path, format!("{content}\n"))?;
            tracing::info!(path = %path.display(), bytes = content.len(), "wrote output");
        }
        None => println!("{content}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn json_is_tab_indented() {
        let value: BTreeMap<&str, u32> = [("version", 1)].into();
        assert_eq!(to_json(&value).expect("json"), "{\n\t\"version\": 1\n}");
    }

    #[test]
    fn write_to_file_appends_newline() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("out.json");
        write(Some(&path), "{}").expect("write");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "{}\n");
    }
}
