//! # tugboat-yaml
//!
//! Raw pipeline configuration model for Tugboat.
//!
//! Handles:
//! - **Config**: The parsed pipeline document (clone, services, groups, resources).
//! - **Container**: Per-container definitions with their flexible YAML shapes.
//! - **Constraint**: Glob include/exclude rules used to gate steps.
//! - **Params**: Free-form plugin parameters as a closed value type.
//! - **Parse**: Parsing single and multi-document pipeline files.
//! - **Matrix**: Build matrix axis expansion.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constraint;
pub mod container;
mod de;
pub mod matrix;
pub mod params;
pub mod parse;

pub use config::Config;
pub use constraint::{Constraint, ConstraintMap, Constraints, Pattern};
pub use container::Container;
pub use params::ParamValue;
