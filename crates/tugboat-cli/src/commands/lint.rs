//! `tug lint`: Check a pipeline file against the lint rules.

use std::path::PathBuf;

use clap::Args;
use tugboat_linter::Linter;

/// Arguments for the `lint` command.
#[derive(Args, Debug)]
pub struct LintArgs {
    /// Path to the pipeline file.
    #[arg(default_value = ".tugboat.yml")]
    pub file: PathBuf,

    /// Lint in trusted mode, allowing privileged settings.
    #[arg(long)]
    pub trusted: bool,
}

/// Executes the `lint` command.
///
/// Every document of a multi-document file is linted; the first failure
/// is reported.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or a document violates
/// a lint rule.
pub fn execute(args: &LintArgs) -> anyhow::Result<()> {
    let configs = tugboat_yaml::parse::parse_multi_file(&args.file)?;
    let linter = Linter::with_defaults(args.trusted);
    for (index, config) in configs.iter().enumerate() {
        linter.lint(config).map_err(|e| {
            anyhow::anyhow!(
                "{} (document {index}, pipeline {}): {e}",
                args.file.display(),
                config.name
            )
        })?;
    }
    println!("{}: {} pipeline(s) ok", args.file.display(), configs.len());
    Ok(())
}
