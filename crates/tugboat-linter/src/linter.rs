//! The policy engine: an ordered list of checks.

use tugboat_common::error::Result;
use tugboat_yaml::Config;

use crate::check::{self, Check};

/// Runs checks in order and surfaces the first failure verbatim.
pub struct Linter {
    checks: Vec<Box<dyn Check>>,
}

impl Linter {
    /// Creates a linter from an explicit list of checks.
    #[must_use]
    pub fn new(checks: Vec<Box<dyn Check>>) -> Self {
        Self { checks }
    }

    /// Creates a linter with the default rule set.
    ///
    /// Trust-gated rules are disabled when `trusted` is `true`.
    #[must_use]
    pub fn with_defaults(trusted: bool) -> Self {
        Self::new(vec![
            Box::new(check::pipeline),
            Box::new(check::each_container(check::command)),
            Box::new(check::each_container(check::commands)),
            Box::new(check::each_container(check::entrypoint)),
            Box::new(check::each_container(check::image)),
            Box::new(check::trusted(trusted)),
            Box::new(check::volumes(trusted)),
            Box::new(check::networks(trusted)),
        ])
    }

    /// Appends a check after the existing ones.
    #[must_use]
    pub fn with_check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Lints the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing check.
    pub fn lint(&self, config: &Config) -> Result<()> {
        tracing::info!(checks = self.checks.len(), "linting pipeline");
        for check in &self.checks {
            if let Err(e) = check.check(config) {
                tracing::debug!(error = %e, "lint check failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Linter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linter")
            .field("checks", &self.checks.len())
            .finish()
    }
}
