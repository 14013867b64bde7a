//! # tugboat-common
//!
//! Shared error definitions, configuration models, constants, and small
//! naming helpers used across the entire Tugboat workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives that the parser, linter,
//! and compiler build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod slug;
pub mod units;
