//! Fleet groundstation.
//!
//! Loads the task set and fleet configuration, computes the allocation,
//! dispatches it over the configured transport, and aggregates results.
//!
//! Two deployment modes:
//! - `FLEET_TRANSPORT=local`: satellites run as in-process tasks over
//!   in-memory FIFO channels
//! - `FLEET_TRANSPORT=nats`: satellites are separate processes reached
//!   through the NATS bus

use std::sync::Arc;

use anyhow::Result;
use fleet_groundstation::config::{Config, TransportKind};
use fleet_groundstation::coordinator::Coordinator;
use fleet_model::{RunConfig, WorkerId};
use fleet_satellite::executor::Executor;
use fleet_transport::{LocalTransport, NatsTransport, Transport};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting fleet groundstation");
    info!(
        tasks_file = %config.tasks_file,
        worker_count = config.worker_count,
        lambda = config.lambda,
        transport = ?config.transport,
        "Configuration loaded"
    );

    let run_config = config.run_config()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    let summary = match config.transport {
        TransportKind::Local => run_local(&config, run_config, shutdown_rx).await?,
        TransportKind::Nats => {
            let transport: Arc<dyn Transport> =
                Arc::new(NatsTransport::connect(&config.nats_url).await?);
            Coordinator::new(transport, run_config)
                .run(shutdown_rx)
                .await?
        }
    };

    // Hand the summary to the reporting collaborator via stdout.
    println!("{}", serde_json::to_string(&summary)?);

    // Release any in-process workers still polling.
    let _ = shutdown_tx.send(true);
    Ok(())
}

/// Offsets the configured seed per worker so fleets do not mirror each
/// other while staying reproducible. Wraps rather than overflows.
fn worker_seed(base: u64, worker: WorkerId) -> u64 {
    base.wrapping_add(u64::from(worker.value()))
}

/// Single-process deployment: the fleet runs as local tasks sharing
/// only the in-memory FIFO channels with the coordinator.
async fn run_local(
    config: &Config,
    run_config: RunConfig,
    shutdown_rx: watch::Receiver<bool>,
) -> Result<fleet_model::RunSummary> {
    let workers = run_config.workers();
    let worker_ids: Vec<_> = workers.iter().map(|w| w.id).collect();
    let transport: Arc<dyn Transport> = Arc::new(LocalTransport::new(&worker_ids));

    let mut executor_handles = Vec::new();
    for worker in &workers {
        let transport = Arc::clone(&transport);
        let shutdown_rx = shutdown_rx.clone();
        let seed = config.rng_seed.map(|s| worker_seed(s, worker.id));
        let worker = *worker;
        executor_handles.push(tokio::spawn(async move {
            let mut executor = Executor::new(transport, worker, seed);
            executor.run(shutdown_rx).await
        }));
    }

    let mut coordinator = Coordinator::new(Arc::clone(&transport), run_config);
    let summary = coordinator.run(shutdown_rx).await?;

    for handle in executor_handles {
        match handle.await {
            Ok(Ok(stats)) => {
                info!(processed = stats.processed, "Executor joined");
            }
            Ok(Err(e)) => error!(error = %e, "Executor failed"),
            Err(e) => error!(error = %e, "Executor task panicked"),
        }
    }

    Ok(summary)
}
