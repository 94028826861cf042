//! Result aggregation.
//!
//! The aggregator is built from the assignment, so it knows exactly
//! which (task, worker) pairs may legally report. Recording is
//! idempotent per pair: the distributed transport may deliver a result
//! more than once, and a duplicate must never double-count. Results for
//! unknown or misrouted tasks are protocol violations; they are logged
//! and discarded, never merged.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use fleet_model::{
    Assignment, ExecutionResult, Outcome, RunSummary, Task, TaskId, Worker, WorkerId,
    WorkerSummary,
};
use fleet_protocol::ResultReport;
use tracing::warn;

/// What happened to one recorded report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// First result for this task; counted.
    Recorded,
    /// Already recorded for the same (task, worker) pair; no-op.
    Duplicate,
    /// The task was never dispatched.
    UnknownTask,
    /// The task was dispatched to a different worker.
    WrongWorker,
}

/// Folds execution results into the run summary.
pub struct Aggregator {
    /// Task → worker, as dispatched. The authority on who may report.
    expected: BTreeMap<TaskId, WorkerId>,
    /// Task → payoff, from the groundstation's own task table.
    payoffs: BTreeMap<TaskId, f64>,
    /// Recorded results, one per dispatched task once complete.
    results: BTreeMap<TaskId, ExecutionResult>,
    /// Every configured worker, so each appears in the summary.
    workers: Vec<WorkerId>,
    /// Tasks the optimizer left unassigned.
    unassigned_count: usize,
}

impl Aggregator {
    /// Builds the aggregator for one dispatched assignment.
    pub fn new(tasks: &[Task], workers: &[Worker], assignment: &Assignment) -> Self {
        let expected: BTreeMap<TaskId, WorkerId> = assignment
            .iter()
            .map(|(t, w)| (t.clone(), w))
            .collect();
        let payoffs = tasks.iter().map(|t| (t.id.clone(), t.payoff)).collect();

        Self {
            unassigned_count: tasks.len() - expected.len(),
            expected,
            payoffs,
            results: BTreeMap::new(),
            workers: workers.iter().map(|w| w.id).collect(),
        }
    }

    /// Records one result report, idempotently.
    ///
    /// `payoff_earned` is recomputed from the groundstation's task
    /// table; a disagreeing worker echo is logged and overridden.
    pub fn record(&mut self, report: &ResultReport) -> RecordOutcome {
        let Some(&expected_worker) = self.expected.get(&report.task_id) else {
            warn!(
                task_id = %report.task_id,
                worker_id = %report.worker_id,
                "Discarding result for task that was never dispatched"
            );
            return RecordOutcome::UnknownTask;
        };

        if expected_worker != report.worker_id {
            warn!(
                task_id = %report.task_id,
                worker_id = %report.worker_id,
                expected_worker = %expected_worker,
                "Discarding result from the wrong worker"
            );
            return RecordOutcome::WrongWorker;
        }

        if self.results.contains_key(&report.task_id) {
            return RecordOutcome::Duplicate;
        }

        let payoff = self.payoffs.get(&report.task_id).copied().unwrap_or(0.0);
        let payoff_earned = if report.succeeded { payoff } else { 0.0 };
        if (payoff_earned - report.payoff_earned).abs() > f64::EPSILON {
            warn!(
                task_id = %report.task_id,
                reported = report.payoff_earned,
                expected = payoff_earned,
                "Worker-reported payoff disagrees with the task table; overriding"
            );
        }

        self.results.insert(
            report.task_id.clone(),
            ExecutionResult {
                task_id: report.task_id.clone(),
                worker_id: report.worker_id,
                outcome: if report.succeeded {
                    Outcome::Succeeded
                } else {
                    Outcome::Failed
                },
                payoff_earned,
            },
        );
        RecordOutcome::Recorded
    }

    /// Dispatched tasks still waiting for a result.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.expected.len() - self.results.len()
    }

    /// Whether every dispatched task has a recorded result.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.pending() == 0
    }

    /// Records a no-response outcome for every task still pending.
    /// Returns how many tasks were marked.
    pub fn mark_no_response(&mut self) -> usize {
        let missing: Vec<(TaskId, WorkerId)> = self
            .expected
            .iter()
            .filter(|(t, _)| !self.results.contains_key(*t))
            .map(|(t, &w)| (t.clone(), w))
            .collect();

        for (task_id, worker_id) in &missing {
            self.results.insert(
                task_id.clone(),
                ExecutionResult {
                    task_id: task_id.clone(),
                    worker_id: *worker_id,
                    outcome: Outcome::NoResponse,
                    payoff_earned: 0.0,
                },
            );
        }
        missing.len()
    }

    /// Produces the run summary. Call only once the completion
    /// condition is reached (all results recorded, or the timeout
    /// handled via [`mark_no_response`]).
    ///
    /// [`mark_no_response`]: Aggregator::mark_no_response
    #[must_use]
    pub fn summarize(
        &self,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    ) -> RunSummary {
        let mut per_worker: BTreeMap<WorkerId, WorkerSummary> = self
            .workers
            .iter()
            .map(|&w| (w, WorkerSummary::default()))
            .collect();

        for worker_id in self.expected.values() {
            if let Some(summary) = per_worker.get_mut(worker_id) {
                summary.assigned_count += 1;
            }
        }

        let mut total_payoff_earned = 0.0;
        for result in self.results.values() {
            let Some(summary) = per_worker.get_mut(&result.worker_id) else {
                continue;
            };
            match result.outcome {
                Outcome::Succeeded => {
                    summary.succeeded_count += 1;
                    summary.payoff_earned += result.payoff_earned;
                    total_payoff_earned += result.payoff_earned;
                }
                Outcome::Failed => summary.failed_count += 1,
                Outcome::NoResponse => summary.no_response_count += 1,
            }
        }

        RunSummary {
            total_payoff_earned,
            assigned_count: self.expected.len(),
            unassigned_count: self.unassigned_count,
            per_worker,
            started_at,
            completed_at,
        }
    }
}
