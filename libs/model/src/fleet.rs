//! Task and worker descriptions.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::id::{TaskId, WorkerId};

/// A discrete unit of work with a payoff earned on success.
///
/// Immutable once loaded; exists for the lifetime of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Unique identifier within the run.
    pub id: TaskId,

    /// Value earned when the task completes successfully. Must be
    /// strictly positive.
    pub payoff: f64,

    /// Resource ids this task holds exclusively on its worker: two
    /// tasks sharing a resource can never be assigned to the same
    /// worker.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<u32>,

    /// Declared execution time from the task file. Informational: the
    /// simulated per-task delay is configured on the satellite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
}

/// A satellite worker with an independent per-task failure probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Worker {
    /// Unique identifier within the fleet.
    pub id: WorkerId,

    /// Chance in `[0, 1]` that any task this worker executes fails.
    pub failure_probability: f64,
}

impl Worker {
    /// Builds the fleet from an ordered probability list. Workers are
    /// numbered from 1 in list order.
    #[must_use]
    pub fn fleet(failure_probabilities: &[f64]) -> Vec<Worker> {
        failure_probabilities
            .iter()
            .enumerate()
            .map(|(i, &p)| Worker {
                id: WorkerId::new(i as u32 + 1),
                failure_probability: p,
            })
            .collect()
    }
}

/// Loads the task set from a JSON file: an array of `{id, payoff}`
/// records. Content validation happens in [`RunConfig::validate`].
///
/// [`RunConfig::validate`]: crate::RunConfig::validate
pub fn load_tasks(path: impl AsRef<Path>) -> Result<Vec<Task>, ConfigError> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|e| ConfigError::TaskFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&data).map_err(|e| ConfigError::TaskFile {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}
