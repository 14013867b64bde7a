//! `tug matrix`: Print the build matrix axes of a pipeline file.

use std::path::PathBuf;

use clap::Args;

/// Arguments for the `matrix` command.
#[derive(Args, Debug)]
pub struct MatrixArgs {
    /// Path to the pipeline file.
    #[arg(default_value = ".tugboat.yml")]
    pub file: PathBuf,

    /// Print the axes as a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `matrix` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the matrix is invalid.
pub fn execute(args: &MatrixArgs) -> anyhow::Result<()> {
    let axes = tugboat_yaml::matrix::parse_file(&args.file)?.unwrap_or_default();
    tracing::info!(path = %args.file.display(), axes = axes.len(), "expanded build matrix");
    if args.json {
        println!("{}", crate::output::to_json(&axes)?);
        return Ok(());
    }
    for axis in &axes {
        println!("{}", tugboat_yaml::matrix::render(axis));
    }
    Ok(())
}
