//! Configuration errors.

use thiserror::Error;

use crate::id::TaskId;

/// Errors detected while validating a run configuration.
///
/// All of these are surfaced to the caller before allocation starts and
/// are never retried automatically.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The failure-probability list does not match the fleet size.
    #[error("fleet size mismatch: {workers} workers but {probabilities} failure probabilities")]
    FleetSizeMismatch {
        workers: usize,
        probabilities: usize,
    },

    /// A failure probability is outside `[0, 1]`.
    #[error("failure probability for worker {worker} out of range: {value}")]
    ProbabilityOutOfRange { worker: u32, value: f64 },

    /// A task payoff is zero or negative.
    #[error("task {task} has non-positive payoff {value}")]
    NonPositivePayoff { task: TaskId, value: f64 },

    /// The same task id appears twice in the task set.
    #[error("duplicate task id: {0}")]
    DuplicateTaskId(TaskId),

    /// A task id is empty.
    #[error("task id is empty")]
    EmptyTaskId,

    /// The optimizer weight is negative.
    #[error("lambda must be non-negative, got {0}")]
    NegativeLambda(f64),

    /// The task set is empty while workers are configured.
    #[error("no tasks configured for a fleet of {workers} workers")]
    NoTasks { workers: usize },

    /// The task file could not be read or parsed.
    #[error("failed to load task file {path}: {reason}")]
    TaskFile { path: String, reason: String },
}
