//! Per-task execution outcomes.

use serde::{Deserialize, Serialize};

use crate::id::{TaskId, WorkerId};

/// How a dispatched task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The worker reported success.
    Succeeded,
    /// The worker reported failure.
    Failed,
    /// No result arrived before the deadline. Distinguishable from a
    /// reported failure.
    NoResponse,
}

impl Outcome {
    /// Whether the task earned its payoff.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

/// The recorded outcome of one dispatched task.
///
/// Produced by a worker (or synthesized at timeout), consumed exactly
/// once by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub task_id: TaskId,
    pub worker_id: WorkerId,
    pub outcome: Outcome,
    /// Equals the task payoff iff the outcome is `Succeeded`, else zero.
    pub payoff_earned: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_names() {
        assert_eq!(
            serde_json::to_string(&Outcome::Succeeded).unwrap(),
            "\"succeeded\""
        );
        assert_eq!(
            serde_json::to_string(&Outcome::NoResponse).unwrap(),
            "\"no_response\""
        );
    }

    #[test]
    fn test_no_response_is_not_success() {
        assert!(Outcome::Succeeded.succeeded());
        assert!(!Outcome::Failed.succeeded());
        assert!(!Outcome::NoResponse.succeeded());
    }
}
