//! Dispatch coordinator.
//!
//! Drives one run through its state machine:
//!
//! ```text
//! Idle -> Allocating -> Dispatching -> AwaitingResults -> Aggregated -> Done
//! ```
//!
//! The coordinator is transport-agnostic: it holds an `Arc<dyn
//! Transport>` and never branches on which variant is active. Malformed
//! or out-of-context messages are logged and discarded; loss of the
//! transport itself aborts the run, since no result could ever be
//! recovered.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use fleet_model::{ConfigError, RunConfig, RunSummary, TaskId};
use fleet_protocol::{EndOfDispatch, Message, TaskDispatch, Topic};
use fleet_transport::{Transport, TransportError};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::aggregator::{Aggregator, RecordOutcome};
use crate::allocator::{allocate, AllocatorConfig};

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum RunError {
    /// The configuration is invalid; nothing was allocated or dispatched.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transport failed; no final summary can be claimed.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

/// Run lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Allocating,
    Dispatching,
    AwaitingResults,
    Aggregated,
    Done,
}

impl RunState {
    fn can_advance_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Idle, RunState::Allocating)
                | (RunState::Allocating, RunState::Dispatching)
                | (RunState::Dispatching, RunState::AwaitingResults)
                | (RunState::AwaitingResults, RunState::Aggregated)
                | (RunState::Aggregated, RunState::Done)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Allocating => "allocating",
            RunState::Dispatching => "dispatching",
            RunState::AwaitingResults => "awaiting_results",
            RunState::Aggregated => "aggregated",
            RunState::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// Groundstation-side coordinator for one run.
pub struct Coordinator {
    transport: Arc<dyn Transport>,
    config: RunConfig,
    state: RunState,
}

impl Coordinator {
    /// Creates a coordinator in the `Idle` state.
    pub fn new(transport: Arc<dyn Transport>, config: RunConfig) -> Self {
        Self {
            transport,
            config,
            state: RunState::Idle,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
    }

    /// Executes one complete run and returns the summary.
    ///
    /// Cancellation via the shutdown channel stops the wait for results
    /// without corrupting partial state: results received before
    /// cancellation remain valid and are included.
    #[instrument(skip_all)]
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary, RunError> {
        // Fail fast on configuration errors, before any allocation.
        self.config.validate()?;
        let started_at = Utc::now();

        self.advance(RunState::Allocating);
        let workers = self.config.workers();
        let allocator_config = AllocatorConfig {
            lambda: self.config.lambda,
            solve_budget: self.config.solve_budget,
            worker_capacity: self.config.worker_capacity,
        };
        let assignment = allocate(&self.config.tasks, &workers, &allocator_config);

        // The results subscription must exist before the first dispatch
        // is published: a zero-delay worker can report before the
        // dispatch loop finishes, and the broker only delivers to
        // subscriptions that already exist.
        self.transport.subscribe(&Topic::Results).await?;

        self.advance(RunState::Dispatching);
        let payoffs: std::collections::BTreeMap<&TaskId, f64> = self
            .config
            .tasks
            .iter()
            .map(|t| (&t.id, t.payoff))
            .collect();

        for worker in &workers {
            let topic = Topic::Tasks(worker.id);
            let task_ids: Vec<&TaskId> = assignment.tasks_for(worker.id).collect();

            for task_id in &task_ids {
                let dispatch = TaskDispatch {
                    task_id: (*task_id).clone(),
                    payoff: payoffs.get(task_id).copied().unwrap_or(0.0),
                    worker_id: worker.id,
                };
                self.transport
                    .send(&topic, &Message::Dispatch(dispatch))
                    .await?;
            }
            self.transport
                .send(
                    &topic,
                    &Message::EndOfDispatch(EndOfDispatch {
                        worker_id: worker.id,
                        task_count: task_ids.len(),
                    }),
                )
                .await?;

            if task_ids.is_empty() {
                debug!(worker_id = %worker.id, "No tasks for worker; vacuously complete");
            } else {
                info!(
                    worker_id = %worker.id,
                    task_count = task_ids.len(),
                    "Dispatched task list"
                );
            }
        }

        self.advance(RunState::AwaitingResults);
        let mut aggregator = Aggregator::new(&self.config.tasks, &workers, &assignment);
        self.await_results(&mut aggregator, &mut shutdown).await?;

        let missing = aggregator.mark_no_response();
        if missing > 0 {
            warn!(missing, "No response for dispatched tasks by deadline");
        }

        self.advance(RunState::Aggregated);
        let summary = aggregator.summarize(started_at, Utc::now());

        self.advance(RunState::Done);
        info!(
            total_payoff_earned = summary.total_payoff_earned,
            assigned = summary.assigned_count,
            unassigned = summary.unassigned_count,
            succeeded = summary.succeeded_count(),
            no_response = summary.no_response_count(),
            "Run complete"
        );
        Ok(summary)
    }

    /// Collects results until every dispatched task has one, the
    /// results timeout elapses, or shutdown is signaled - whichever
    /// comes first.
    async fn await_results(
        &self,
        aggregator: &mut Aggregator,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<(), RunError> {
        let deadline = Instant::now() + self.config.results_timeout;

        while !aggregator.is_complete() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                debug!("Results timeout elapsed");
                break;
            }

            let received = tokio::select! {
                received = self.transport.recv(&Topic::Results, remaining) => received?,
                changed = shutdown.changed() => {
                    // A closed channel counts as cancellation.
                    if changed.is_err() || *shutdown.borrow() {
                        info!(
                            pending = aggregator.pending(),
                            "Run cancelled while awaiting results"
                        );
                        break;
                    }
                    continue;
                }
            };

            match received {
                Some(Message::Result(report)) => match aggregator.record(&report) {
                    RecordOutcome::Recorded => {
                        debug!(
                            task_id = %report.task_id,
                            worker_id = %report.worker_id,
                            succeeded = report.succeeded,
                            pending = aggregator.pending(),
                            "Result recorded"
                        );
                    }
                    RecordOutcome::Duplicate => {
                        debug!(task_id = %report.task_id, "Duplicate result ignored");
                    }
                    // Already logged inside the aggregator.
                    RecordOutcome::UnknownTask | RecordOutcome::WrongWorker => {}
                },
                Some(other) => {
                    warn!(message = ?other, "Discarding non-result message on results topic");
                }
                None => {
                    debug!("Results timeout elapsed");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Runs one complete run with a fresh coordinator; convenience for
/// callers that do not need to observe intermediate state.
pub async fn run_once(
    transport: Arc<dyn Transport>,
    config: RunConfig,
    shutdown: watch::Receiver<bool>,
) -> Result<RunSummary, RunError> {
    Coordinator::new(transport, config).run(shutdown).await
}
