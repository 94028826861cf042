//! Run configuration.
//!
//! A `RunConfig` is built once by the external loader (env vars plus the
//! task file), validated fail-fast, and then passed immutably into each
//! component at construction. No component reads ambient global state.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::ConfigError;
use crate::fleet::{Task, Worker};

/// Default optimizer weight for the load-imbalance penalty.
pub const DEFAULT_LAMBDA: f64 = 1.0;

/// Default bound on optimizer solve time.
pub const DEFAULT_SOLVE_BUDGET: Duration = Duration::from_secs(5);

/// Default bound on the wait for worker results.
pub const DEFAULT_RESULTS_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable configuration for a single run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// The task set, in load order.
    pub tasks: Vec<Task>,

    /// Number of workers in the fleet.
    pub worker_count: usize,

    /// Per-worker failure probabilities, one per worker, in fleet order.
    pub failure_probabilities: Vec<f64>,

    /// Weight of the load-imbalance penalty in the objective.
    pub lambda: f64,

    /// Bound on optimizer solve time.
    pub solve_budget: Duration,

    /// Bound on the wait for worker results.
    pub results_timeout: Duration,

    /// Seed for worker simulation, for reproducible runs. `None` seeds
    /// from entropy.
    pub rng_seed: Option<u64>,

    /// Optional per-worker assigned-task capacity. `None` is unbounded.
    pub worker_capacity: Option<usize>,
}

impl RunConfig {
    /// Creates a configuration with default tuning values.
    pub fn new(tasks: Vec<Task>, failure_probabilities: Vec<f64>) -> Self {
        Self {
            tasks,
            worker_count: failure_probabilities.len(),
            failure_probabilities,
            lambda: DEFAULT_LAMBDA,
            solve_budget: DEFAULT_SOLVE_BUDGET,
            results_timeout: DEFAULT_RESULTS_TIMEOUT,
            rng_seed: None,
            worker_capacity: None,
        }
    }

    /// Validates the configuration.
    ///
    /// Violations here are configuration errors, not runtime faults: the
    /// run fails before any allocation occurs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count != self.failure_probabilities.len() {
            return Err(ConfigError::FleetSizeMismatch {
                workers: self.worker_count,
                probabilities: self.failure_probabilities.len(),
            });
        }

        for (i, &p) in self.failure_probabilities.iter().enumerate() {
            if !(0.0..=1.0).contains(&p) || p.is_nan() {
                return Err(ConfigError::ProbabilityOutOfRange {
                    worker: i as u32 + 1,
                    value: p,
                });
            }
        }

        if self.tasks.is_empty() && self.worker_count > 0 {
            return Err(ConfigError::NoTasks {
                workers: self.worker_count,
            });
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.id.is_empty() {
                return Err(ConfigError::EmptyTaskId);
            }
            if !seen.insert(task.id.clone()) {
                return Err(ConfigError::DuplicateTaskId(task.id.clone()));
            }
            if !(task.payoff > 0.0) {
                return Err(ConfigError::NonPositivePayoff {
                    task: task.id.clone(),
                    value: task.payoff,
                });
            }
        }

        if !(self.lambda >= 0.0) {
            return Err(ConfigError::NegativeLambda(self.lambda));
        }

        Ok(())
    }

    /// Builds the worker fleet from the probability list.
    #[must_use]
    pub fn workers(&self) -> Vec<Worker> {
        Worker::fleet(&self.failure_probabilities)
    }
}
