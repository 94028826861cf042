//! Run summaries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::WorkerId;

/// Per-worker breakdown of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerSummary {
    /// Tasks dispatched to this worker.
    pub assigned_count: usize,
    /// Tasks the worker reported as succeeded.
    pub succeeded_count: usize,
    /// Tasks the worker reported as failed.
    pub failed_count: usize,
    /// Tasks with no result by the deadline.
    pub no_response_count: usize,
    /// Payoff earned from succeeded tasks.
    pub payoff_earned: f64,
}

/// Aggregated outcome of one run. Derived and read-only; produced only
/// after every dispatched task has a recorded outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Total payoff earned across the fleet.
    pub total_payoff_earned: f64,
    /// Tasks the optimizer assigned.
    pub assigned_count: usize,
    /// Tasks the optimizer left unassigned.
    pub unassigned_count: usize,
    /// Breakdown per worker. Every configured worker appears, even with
    /// zero assignments.
    pub per_worker: BTreeMap<WorkerId, WorkerSummary>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When aggregation completed.
    pub completed_at: DateTime<Utc>,
}

impl RunSummary {
    /// Total count of tasks that never responded, across workers.
    #[must_use]
    pub fn no_response_count(&self) -> usize {
        self.per_worker.values().map(|w| w.no_response_count).sum()
    }

    /// Total count of succeeded tasks, across workers.
    #[must_use]
    pub fn succeeded_count(&self) -> usize {
        self.per_worker.values().map(|w| w.succeeded_count).sum()
    }
}
