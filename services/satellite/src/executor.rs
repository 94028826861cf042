//! Task execution loop.
//!
//! For each dispatched task the executor runs one independent Bernoulli
//! trial with the worker's failure probability and reports the outcome
//! immediately. Results stream back one per task, not as a batch at the
//! end. The random source is seedable so runs are reproducible under
//! test; each worker owns its own source and shares no state with other
//! workers.

use std::sync::Arc;
use std::time::Duration;

use fleet_model::Worker;
use fleet_protocol::{Message, ResultReport, TaskDispatch, Topic};
use fleet_transport::{Transport, TransportError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How long each receive poll waits before re-checking for shutdown.
const RECV_POLL: Duration = Duration::from_millis(200);

/// Errors that end an executor run.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

/// Counters for one executor run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecStats {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Executes the task list assigned to one worker.
pub struct Executor {
    transport: Arc<dyn Transport>,
    worker: Worker,
    rng: StdRng,
    execution_delay: Duration,
}

impl Executor {
    /// Creates an executor. `seed` fixes the trial sequence for
    /// reproducible runs; `None` seeds from OS entropy.
    pub fn new(transport: Arc<dyn Transport>, worker: Worker, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            transport,
            worker,
            rng,
            execution_delay: Duration::ZERO,
        }
    }

    /// Simulated per-task execution time. Zero by default.
    #[must_use]
    pub fn with_execution_delay(mut self, delay: Duration) -> Self {
        self.execution_delay = delay;
        self
    }

    /// Receives dispatches until the end-of-dispatch sentinel (or
    /// shutdown), executing each task as it arrives.
    pub async fn run(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ExecStats, ExecError> {
        let topic = Topic::Tasks(self.worker.id);
        self.transport.subscribe(&topic).await?;

        info!(
            worker_id = %self.worker.id,
            failure_probability = self.worker.failure_probability,
            "Satellite ready for tasking"
        );

        let mut stats = ExecStats::default();

        loop {
            let message = tokio::select! {
                received = self.transport.recv(&topic, RECV_POLL) => {
                    match received? {
                        Some(message) => message,
                        None => continue,
                    }
                }
                changed = shutdown.changed() => {
                    // A closed channel means the coordinator is gone;
                    // treat it like a shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        info!(worker_id = %self.worker.id, "Executor shutting down");
                        break;
                    }
                    continue;
                }
            };

            match message {
                Message::Dispatch(dispatch) => {
                    if dispatch.worker_id != self.worker.id {
                        warn!(
                            worker_id = %self.worker.id,
                            addressed_to = %dispatch.worker_id,
                            task_id = %dispatch.task_id,
                            "Discarding misrouted dispatch"
                        );
                        continue;
                    }
                    let report = self.execute(&dispatch).await;
                    stats.processed += 1;
                    if report.succeeded {
                        stats.succeeded += 1;
                    } else {
                        stats.failed += 1;
                    }
                    self.transport
                        .send(&Topic::Results, &Message::Result(report))
                        .await?;
                }
                Message::EndOfDispatch(end) => {
                    if end.worker_id != self.worker.id {
                        warn!(
                            worker_id = %self.worker.id,
                            addressed_to = %end.worker_id,
                            "Discarding misrouted sentinel"
                        );
                        continue;
                    }
                    if end.task_count != stats.processed {
                        warn!(
                            worker_id = %self.worker.id,
                            expected = end.task_count,
                            processed = stats.processed,
                            "Batch count mismatch at end of dispatch"
                        );
                    }
                    break;
                }
                other => {
                    warn!(
                        worker_id = %self.worker.id,
                        message = ?other,
                        "Discarding unexpected message on task topic"
                    );
                }
            }
        }

        info!(
            worker_id = %self.worker.id,
            processed = stats.processed,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "Executor finished"
        );
        Ok(stats)
    }

    /// One independent Bernoulli trial for one task.
    async fn execute(&mut self, dispatch: &TaskDispatch) -> ResultReport {
        if !self.execution_delay.is_zero() {
            tokio::time::sleep(self.execution_delay).await;
        }

        let failed = self.rng.random::<f64>() < self.worker.failure_probability;
        let payoff_earned = if failed { 0.0 } else { dispatch.payoff };

        debug!(
            worker_id = %self.worker.id,
            task_id = %dispatch.task_id,
            succeeded = !failed,
            payoff_earned,
            "Task executed"
        );

        ResultReport {
            task_id: dispatch.task_id.clone(),
            worker_id: self.worker.id,
            succeeded: !failed,
            payoff_earned,
        }
    }
}

#[cfg(test)]
mod tests {
    use fleet_model::{TaskId, WorkerId};
    use fleet_transport::LocalTransport;

    use super::*;

    fn worker(id: u32, failure_probability: f64) -> Worker {
        Worker {
            id: WorkerId::new(id),
            failure_probability,
        }
    }

    fn dispatch(task: &str, worker: u32, payoff: f64) -> Message {
        Message::Dispatch(TaskDispatch {
            task_id: task.parse::<TaskId>().unwrap(),
            payoff,
            worker_id: WorkerId::new(worker),
        })
    }

    fn end_of_dispatch(worker: u32, task_count: usize) -> Message {
        Message::EndOfDispatch(fleet_protocol::EndOfDispatch {
            worker_id: WorkerId::new(worker),
            task_count,
        })
    }

    async fn run_batch(fp: f64, messages: Vec<Message>) -> (ExecStats, Vec<ResultReport>) {
        let transport = Arc::new(LocalTransport::new(&[WorkerId::new(1)]));
        let topic = Topic::Tasks(WorkerId::new(1));
        for message in &messages {
            transport.send(&topic, message).await.unwrap();
        }

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut executor = Executor::new(Arc::clone(&transport) as Arc<dyn Transport>,
            worker(1, fp), Some(42));
        let stats = executor.run(shutdown_rx).await.unwrap();

        let mut reports = Vec::new();
        while let Some(Message::Result(report)) = transport
            .recv(&Topic::Results, Duration::from_millis(50))
            .await
            .unwrap()
        {
            reports.push(report);
        }
        (stats, reports)
    }

    #[tokio::test]
    async fn test_zero_failure_probability_always_succeeds() {
        let (stats, reports) = run_batch(
            0.0,
            vec![
                dispatch("a", 1, 10.0),
                dispatch("b", 1, 20.0),
                end_of_dispatch(1, 2),
            ],
        )
        .await;

        assert_eq!(stats, ExecStats { processed: 2, succeeded: 2, failed: 0 });
        assert!(reports.iter().all(|r| r.succeeded));
        assert_eq!(reports.iter().map(|r| r.payoff_earned).sum::<f64>(), 30.0);
    }

    #[tokio::test]
    async fn test_certain_failure_earns_nothing() {
        let (stats, reports) = run_batch(
            1.0,
            vec![dispatch("a", 1, 10.0), end_of_dispatch(1, 1)],
        )
        .await;

        assert_eq!(stats, ExecStats { processed: 1, succeeded: 0, failed: 1 });
        assert!(!reports[0].succeeded);
        assert_eq!(reports[0].payoff_earned, 0.0);
    }

    #[tokio::test]
    async fn test_results_stream_per_task() {
        let (_stats, reports) = run_batch(
            0.0,
            vec![
                dispatch("a", 1, 1.0),
                dispatch("b", 1, 2.0),
                dispatch("c", 1, 3.0),
                end_of_dispatch(1, 3),
            ],
        )
        .await;

        // One report per task, in dispatch order on the local FIFO.
        let ids: Vec<_> = reports.iter().map(|r| r.task_id.to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_misrouted_dispatch_discarded() {
        let (stats, reports) = run_batch(
            0.0,
            vec![dispatch("a", 9, 10.0), end_of_dispatch(1, 0)],
        )
        .await;

        assert_eq!(stats.processed, 0);
        assert!(reports.is_empty());
    }

    #[tokio::test]
    async fn test_seeded_runs_are_reproducible() {
        let messages = || {
            vec![
                dispatch("a", 1, 10.0),
                dispatch("b", 1, 10.0),
                dispatch("c", 1, 10.0),
                dispatch("d", 1, 10.0),
                end_of_dispatch(1, 4),
            ]
        };

        let (_s1, first) = run_batch(0.5, messages()).await;
        let (_s2, second) = run_batch(0.5, messages()).await;
        assert_eq!(first, second);
    }
}
