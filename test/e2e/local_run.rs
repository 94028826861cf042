//! End-to-end runs over the local transport.
//!
//! These tests drive the full flow - allocation, dispatch, execution,
//! aggregation - with the groundstation coordinator and satellite
//! executors sharing only the in-memory FIFO channels, exactly as the
//! local deployment wires them.
//!
//! ## Running
//!
//! ```bash
//! cargo test -p fleet-e2e --test local_run
//! ```

use std::sync::Arc;
use std::time::Duration;

use fleet_groundstation::coordinator::{Coordinator, RunError, RunState};
use fleet_model::{ConfigError, RunConfig, RunSummary, Task, TaskId, Worker, WorkerId};
use fleet_protocol::{Message, ResultReport, Topic};
use fleet_satellite::executor::Executor;
use fleet_transport::{LocalTransport, Transport};
use tokio::sync::watch;

fn task(id: &str, payoff: f64) -> Task {
    Task {
        id: id.parse::<TaskId>().unwrap(),
        payoff,
        resources: Vec::new(),
        execution_time: None,
    }
}

fn run_config(tasks: Vec<Task>, fps: Vec<f64>) -> RunConfig {
    let mut config = RunConfig::new(tasks, fps);
    config.results_timeout = Duration::from_secs(5);
    config.solve_budget = Duration::from_millis(500);
    config
}

fn local_transport(config: &RunConfig) -> Arc<dyn Transport> {
    let ids: Vec<WorkerId> = config.workers().iter().map(|w| w.id).collect();
    Arc::new(LocalTransport::new(&ids))
}

/// Spawns one executor task per worker, as the local deployment does.
fn spawn_fleet(
    transport: &Arc<dyn Transport>,
    workers: &[Worker],
    shutdown: &watch::Receiver<bool>,
) -> Vec<tokio::task::JoinHandle<()>> {
    workers
        .iter()
        .map(|&worker| {
            let transport = Arc::clone(transport);
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                let mut executor = Executor::new(transport, worker, Some(7));
                executor.run(shutdown).await.expect("executor run");
            })
        })
        .collect()
}

async fn run_with_fleet(config: RunConfig) -> RunSummary {
    let transport = local_transport(&config);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let handles = spawn_fleet(&transport, &config.workers(), &shutdown_rx);
    let mut coordinator = Coordinator::new(Arc::clone(&transport), config);
    let summary = coordinator.run(shutdown_rx).await.expect("run");
    assert_eq!(coordinator.state(), RunState::Done);

    for handle in handles {
        handle.await.expect("executor join");
    }
    summary
}

#[tokio::test]
async fn test_reliable_worker_earns_every_payoff() {
    // 3 tasks, 1 worker, failure probability 0 -> total 60, all succeed.
    let config = run_config(
        vec![task("a", 10.0), task("b", 20.0), task("c", 30.0)],
        vec![0.0],
    );
    let summary = run_with_fleet(config).await;

    assert_eq!(summary.total_payoff_earned, 60.0);
    assert_eq!(summary.succeeded_count(), 3);
    assert_eq!(summary.no_response_count(), 0);
    assert_eq!(summary.per_worker[&WorkerId::new(1)].assigned_count, 3);
}

#[tokio::test]
async fn test_certain_failure_earns_nothing() {
    // Same tasks, failure probability 1 -> total 0, all reported failed
    // (not missing: the worker did answer).
    let config = run_config(
        vec![task("a", 10.0), task("b", 20.0), task("c", 30.0)],
        vec![1.0],
    );
    let summary = run_with_fleet(config).await;

    assert_eq!(summary.total_payoff_earned, 0.0);
    assert_eq!(summary.succeeded_count(), 0);
    assert_eq!(summary.per_worker[&WorkerId::new(1)].failed_count, 3);
    assert_eq!(summary.no_response_count(), 0);
}

#[tokio::test]
async fn test_large_lambda_splits_equal_tasks_evenly() {
    let mut config = run_config(
        vec![
            task("a", 10.0),
            task("b", 10.0),
            task("c", 10.0),
            task("d", 10.0),
        ],
        vec![0.0, 0.0],
    );
    config.lambda = 1000.0;
    let summary = run_with_fleet(config).await;

    assert_eq!(summary.per_worker[&WorkerId::new(1)].assigned_count, 2);
    assert_eq!(summary.per_worker[&WorkerId::new(2)].assigned_count, 2);
    assert_eq!(summary.total_payoff_earned, 40.0);
}

#[tokio::test]
async fn test_fleet_size_mismatch_fails_before_dispatch() {
    // Worker count 2 but three probabilities -> configuration error,
    // surfaced before any allocation.
    let mut config = run_config(vec![task("a", 10.0)], vec![0.1, 0.1, 0.1]);
    config.worker_count = 2;

    let transport = local_transport(&config);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut coordinator = Coordinator::new(transport, config);

    let err = coordinator.run(shutdown_rx).await.unwrap_err();
    assert!(matches!(
        err,
        RunError::Config(ConfigError::FleetSizeMismatch { .. })
    ));
    assert_eq!(coordinator.state(), RunState::Idle);
}

#[tokio::test]
async fn test_spurious_result_is_discarded() {
    // A result for a task id that was never dispatched arrives on the
    // results topic; the run is unaffected.
    let config = run_config(vec![task("a", 10.0), task("b", 20.0)], vec![0.0]);
    let transport = local_transport(&config);

    transport
        .send(
            &Topic::Results,
            &Message::Result(ResultReport {
                task_id: "phantom".parse().unwrap(),
                worker_id: WorkerId::new(1),
                succeeded: true,
                payoff_earned: 999.0,
            }),
        )
        .await
        .unwrap();

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = spawn_fleet(&transport, &config.workers(), &shutdown_rx);
    let summary = Coordinator::new(Arc::clone(&transport), config)
        .run(shutdown_rx)
        .await
        .unwrap();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(summary.total_payoff_earned, 30.0);
    assert_eq!(summary.assigned_count, 2);
}

#[tokio::test]
async fn test_duplicate_results_counted_once() {
    // A satellite stand-in that reports every outcome twice, as an
    // at-least-once bus is allowed to.
    let config = run_config(vec![task("a", 10.0), task("b", 20.0)], vec![0.0]);
    let transport = local_transport(&config);

    let echo_twice = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let topic = Topic::Tasks(WorkerId::new(1));
            loop {
                match transport.recv(&topic, Duration::from_secs(5)).await.unwrap() {
                    Some(Message::Dispatch(dispatch)) => {
                        let report = Message::Result(ResultReport {
                            task_id: dispatch.task_id,
                            worker_id: dispatch.worker_id,
                            succeeded: true,
                            payoff_earned: dispatch.payoff,
                        });
                        transport.send(&Topic::Results, &report).await.unwrap();
                        transport.send(&Topic::Results, &report).await.unwrap();
                    }
                    Some(Message::EndOfDispatch(_)) | None => break,
                    Some(_) => {}
                }
            }
        })
    };

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let summary = Coordinator::new(Arc::clone(&transport), config)
        .run(shutdown_rx)
        .await
        .unwrap();
    echo_twice.await.unwrap();

    assert_eq!(summary.total_payoff_earned, 30.0);
    assert_eq!(summary.succeeded_count(), 2);
    assert_eq!(summary.per_worker[&WorkerId::new(1)].succeeded_count, 2);
}

#[tokio::test]
async fn test_silent_worker_marked_no_response() {
    // No executor is listening; the wait times out and every task is
    // recorded as no-response, distinguishable from a reported failure.
    let mut config = run_config(
        vec![task("a", 10.0), task("b", 20.0), task("c", 30.0)],
        vec![0.5],
    );
    config.results_timeout = Duration::from_millis(300);

    let transport = local_transport(&config);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let summary = Coordinator::new(transport, config)
        .run(shutdown_rx)
        .await
        .unwrap();

    assert_eq!(summary.total_payoff_earned, 0.0);
    assert_eq!(summary.no_response_count(), 3);
    assert_eq!(summary.per_worker[&WorkerId::new(1)].failed_count, 0);
}

#[tokio::test]
async fn test_cancellation_keeps_recorded_results() {
    // One of two tasks gets a result, then the run is cancelled. The
    // recorded result survives; the other is marked no-response.
    let config = run_config(vec![task("a", 10.0), task("b", 20.0)], vec![0.0]);
    let transport = local_transport(&config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let respond_once = {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let topic = Topic::Tasks(WorkerId::new(1));
            // Answer only the first dispatch, then go silent.
            if let Some(Message::Dispatch(dispatch)) =
                transport.recv(&topic, Duration::from_secs(5)).await.unwrap()
            {
                let report = Message::Result(ResultReport {
                    task_id: dispatch.task_id,
                    worker_id: dispatch.worker_id,
                    succeeded: true,
                    payoff_earned: dispatch.payoff,
                });
                transport.send(&Topic::Results, &report).await.unwrap();
            }
        })
    };

    let coordinator_run = {
        let transport = Arc::clone(&transport);
        let mut config = config;
        config.results_timeout = Duration::from_secs(60);
        tokio::spawn(async move {
            Coordinator::new(transport, config).run(shutdown_rx).await
        })
    };

    respond_once.await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown_tx.send(true).unwrap();

    let summary = coordinator_run.await.unwrap().unwrap();
    assert_eq!(summary.succeeded_count(), 1);
    assert_eq!(summary.total_payoff_earned, 10.0);
    assert_eq!(summary.no_response_count(), 1);
}
