//! Configuration for the satellite worker.

use anyhow::{Context, Result};
use fleet_model::WorkerId;

/// Satellite configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of this worker within the fleet.
    pub worker_id: WorkerId,

    /// Chance in `[0, 1]` that any executed task fails.
    pub failure_probability: f64,

    /// NATS broker URL.
    pub nats_url: String,

    /// Seed for the simulation RNG; unseeded when absent.
    pub rng_seed: Option<u64>,

    /// Simulated per-task execution time in milliseconds.
    pub execution_delay_ms: u64,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let worker_id: WorkerId = std::env::var("FLEET_WORKER_ID")
            .context("FLEET_WORKER_ID is required")?
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid FLEET_WORKER_ID: {e}"))?;

        let failure_probability = std::env::var("FLEET_FAILURE_PROB")
            .unwrap_or_else(|_| "0.1".to_string())
            .parse()
            .context("invalid FLEET_FAILURE_PROB")?;

        let nats_url = std::env::var("FLEET_NATS_URL")
            .unwrap_or_else(|_| "nats://127.0.0.1:4222".to_string());

        let rng_seed = std::env::var("FLEET_RNG_SEED")
            .ok()
            .and_then(|s| s.parse().ok());

        let execution_delay_ms = std::env::var("FLEET_EXECUTION_DELAY_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        let log_level = std::env::var("FLEET_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            worker_id,
            failure_probability,
            nats_url,
            rng_seed,
            execution_delay_ms,
            log_level,
        })
    }
}
