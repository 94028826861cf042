//! Fleet satellite worker.
//!
//! Connects to the NATS bus, subscribes to its own task topic, executes
//! whatever the groundstation assigns, and streams results back. The
//! satellite makes no decisions of its own.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use fleet_model::Worker;
use fleet_satellite::{config::Config, executor::Executor};
use fleet_transport::{NatsTransport, Transport};
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

    info!(
        worker_id = %config.worker_id,
        failure_probability = config.failure_probability,
        nats_url = %config.nats_url,
        "Starting fleet satellite"
    );

    let transport: Arc<dyn Transport> = Arc::new(NatsTransport::connect(&config.nats_url).await?);

    let worker = Worker {
        id: config.worker_id,
        failure_probability: config.failure_probability,
    };
    let mut executor = Executor::new(transport, worker, config.rng_seed)
        .with_execution_delay(Duration::from_millis(config.execution_delay_ms));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            let _ = shutdown_tx.send(true);
        }
    });

    match executor.run(shutdown_rx).await {
        Ok(stats) => {
            info!(
                processed = stats.processed,
                succeeded = stats.succeeded,
                failed = stats.failed,
                "Satellite run complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Executor failed");
            Err(e.into())
        }
    }
}
