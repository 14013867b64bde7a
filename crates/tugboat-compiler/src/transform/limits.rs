//! Host resource limits.
//!
//! Touches: `mem_limit`, `mem_swap_limit`, `shm_size`, `cpu_quota`,
//! `cpu_shares`, `cpu_set`.

use tugboat_common::config::ResourceLimits;
use tugboat_common::error::Result;
use tugboat_yaml::{Config, Container};

use super::Transform;
use crate::spec::Step;

/// Copies every limit onto the step, including zero values.
pub fn limits(limits: ResourceLimits) -> impl Transform {
    move |step: &mut Step, _: &Container, _: &Config| -> Result<()> {
        step.mem_limit = limits.mem_limit;
        step.mem_swap_limit = limits.mem_swap_limit;
        step.shm_size = limits.shm_size;
        step.cpu_quota = limits.cpu_quota;
        step.cpu_shares = limits.cpu_shares;
        step.cpu_set.clone_from(&limits.cpu_set);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_overwrite_step_values() {
        let mut step = Step {
            mem_limit: 5,
            cpu_set: "0".into(),
            ..Step::default()
        };
        let transform = limits(ResourceLimits {
            mem_limit: 1,
            mem_swap_limit: 2,
            shm_size: 3,
            cpu_quota: 4,
            cpu_shares: 5,
            cpu_set: "0,2".into(),
        });
        transform
            .apply(&mut step, &Container::default(), &Config::default())
            .expect("apply");
        assert_eq!(step.mem_limit, 1);
        assert_eq!(step.mem_swap_limit, 2);
        assert_eq!(step.shm_size, 3);
        assert_eq!(step.cpu_quota, 4);
        assert_eq!(step.cpu_shares, 5);
        assert_eq!(step.cpu_set, "0,2");
    }

    #[test]
    fn zero_limits_clear_step_values() {
        let mut step = Step {
            shm_size: 64,
            ..Step::default()
        };
        limits(ResourceLimits::default())
            .apply(&mut step, &Container::default(), &Config::default())
            .expect("apply");
        assert_eq!(step.shm_size, 0);
    }
}
