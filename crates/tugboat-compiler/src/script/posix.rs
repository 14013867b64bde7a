//! POSIX shell build scripts, shipped as a tar archive in a data URL.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tugboat_common::constants::SCRIPT_PATH;
use tugboat_common::error::{Result, TugboatError};

use super::quote;

const SETUP: &str = r#"
if [ -n "$CI_NETRC_MACHINE" ]; then
cat <<EOF > $HOME/.netrc
machine $CI_NETRC_MACHINE
login $CI_NETRC_USERNAME
password $CI_NETRC_PASSWORD
EOF
chmod 0600 $HOME/.netrc
fi
unset CI_NETRC_USERNAME
unset CI_NETRC_PASSWORD
unset CI_SCRIPT

set -e

"#;

const DATA_URL_PREFIX: &str = "data:application/octet-stream;base64,";

/// Generates the shell script for `commands`.
#[must_use]
pub fn generate(commands: &[String]) -> String {
    let mut script = String::from(SETUP);
    for command in commands {
        let traced = quote(command).replace('$', r"\$");
        script.push_str("\necho + ");
        script.push_str(&traced);
        script.push('\n');
        script.push_str(command);
        script.push('\n');
    }
    script.push('\n');
    script
}

/// Packs the script into a single-file tar archive at the script path.
///
/// The entry has a zero modification time so identical scripts produce
/// identical archives.
///
/// # Errors
///
/// Returns an error if the archive cannot be written.
pub fn archive(script: &str) -> Result<Vec<u8>> {
    let path = SCRIPT_PATH.trim_start_matches('/');
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(script.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder
        .append_data(&mut header, path, script.as_bytes())
        .map_err(|e| archive_error(&e))?;
    builder.into_inner().map_err(|e| archive_error(&e))
}

fn archive_error(e: &std::io::Error) -> TugboatError {
    TugboatError::Compile {
        message: format!("cannot write build script archive: {e}"),
    }
}

/// Encodes bytes as a base64 data URL.
#[must_use]
pub fn data_url(bytes: &[u8]) -> String {
    format!("{DATA_URL_PREFIX}{}", STANDARD.encode(bytes))
}
