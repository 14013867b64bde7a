//! CLI command definitions and dispatch.

pub mod compile;
pub mod lint;
pub mod matrix;

use clap::{Parser, Subcommand};

/// Tugboat: compiles CI pipelines into container execution specs.
#[derive(Parser, Debug)]
#[command(name = "tug", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a pipeline file against the lint rules.
    Lint(lint::LintArgs),
    /// Compile a pipeline file into the runtime spec.
    Compile(compile::CompileArgs),
    /// Print the build matrix axes of a pipeline file.
    Matrix(matrix::MatrixArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Lint(args) => lint::execute(&args),
        Command::Compile(args) => compile::execute(args),
        Command::Matrix(args) => matrix::execute(&args),
    }
}
