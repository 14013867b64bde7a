//! # tugboat-compiler
//!
//! Compiles a parsed pipeline into the container execution spec consumed
//! by the runtime engine.
//!
//! Handles:
//! - **Spec**: The compiled stages, steps, volumes and networks.
//! - **Compiler**: Step copying, stage assembly and `when` filtering.
//! - **Transforms**: Ordered step mutations (plugins, scripts, secrets, workspace).
//! - **Script**: POSIX and PowerShell build script generation.
//! - **Image**: Docker image reference normalization and matching.
//! - **Namespace**: Per-compile unique resource names.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod builder;
pub mod compiler;
pub mod image;
pub mod namespace;
pub mod script;
pub mod spec;
pub mod transform;

pub use builder::CompilerBuilder;
pub use compiler::{Compiler, Metadata};
pub use spec::Spec;
