//! PowerShell build scripts, shipped base64 encoded in an environment
//! variable.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Entrypoint that runs the PowerShell command line.
pub const ENTRYPOINT: &[&str] = &["powershell", "-noprofile", "-noninteractive", "-command"];

/// Command that decodes the script from `CI_SCRIPT` and runs it.
pub const COMMAND: &str = "[System.Text.Encoding]::UTF8.GetString([System.Convert]::FromBase64String($Env:CI_SCRIPT)) | iex";

/// Home directory of Windows build steps.
pub const HOME: &str = r"c:\root";

/// Shell reported to Windows build steps.
pub const SHELL: &str = "powershell.exe";

const SETUP: &str = r#"
$ErrorActionPreference = 'Stop';
&cmd /c "mkdir c:\root";
if ($Env:CI_NETRC_MACHINE) {
$netrc=[string]::Format("{0}\_netrc",$Env:HOME);
"machine $Env:CI_NETRC_MACHINE" >> $netrc;
"login $Env:CI_NETRC_USERNAME" >> $netrc;
"password $Env:CI_NETRC_PASSWORD" >> $netrc;
};
[Environment]::SetEnvironmentVariable("CI_NETRC_USERNAME",$null);
[Environment]::SetEnvironmentVariable("CI_NETRC_PASSWORD",$null);
[Environment]::SetEnvironmentVariable("CI_SCRIPT",$null);
"#;

/// Generates the PowerShell script for `commands`.
///
/// Each command is checked individually so a failing native command
/// stops the script with its own exit code.
#[must_use]
pub fn generate(commands: &[String]) -> String {
    let mut script = String::from(SETUP);
    for command in commands {
        let traced = command.replace('\'', "''");
        script.push_str("\nWrite-Output ('+ ");
        script.push_str(&traced);
        script.push_str("');\n& ");
        script.push_str(command);
        script.push_str("; if ($LASTEXITCODE -ne 0) {exit $LASTEXITCODE}\n");
    }
    script.push('\n');
    script
}

/// Encodes the script for transport in `CI_SCRIPT`.
#[must_use]
pub fn encode(script: &str) -> String {
    STANDARD.encode(script.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_command_propagates_exit_code() {
        let script = generate(&["go build".into(), "go test".into()]);
        assert!(script.contains(
            "\nWrite-Output ('+ go build');\n& go build; if ($LASTEXITCODE -ne 0) {exit $LASTEXITCODE}\n"
        ));
        assert_eq!(script.matches("exit $LASTEXITCODE").count(), 2);
        assert!(script.starts_with("\n$ErrorActionPreference = 'Stop';"));
    }

    #[test]
    fn trace_escapes_single_quotes() {
        let script = generate(&["echo 'hi'".into()]);
        assert!(script.contains("Write-Output ('+ echo ''hi''');"));
    }

    #[test]
    fn encode_is_standard_base64() {
        assert_eq!(encode("hi"), "aGk=");
    }
}
