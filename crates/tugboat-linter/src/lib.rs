//! # tugboat-linter
//!
//! Policy checks that reject a pipeline before it is compiled.
//!
//! Handles:
//! - **Linter**: Runs an ordered list of checks, stopping at the first failure.
//! - **Check**: Individual structural and trust-gated rules, plus the
//!   container classification helpers they share.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod check;
pub mod linter;

pub use check::Check;
pub use linter::Linter;
