//! Configuration for the groundstation.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use fleet_model::{load_tasks, RunConfig};

/// Which transport variant carries the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// In-process FIFO channels; satellites run as local tasks.
    Local,
    /// NATS pub/sub; satellites run as separate processes.
    Nats,
}

impl FromStr for TransportKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(TransportKind::Local),
            "nats" => Ok(TransportKind::Nats),
            other => anyhow::bail!("unknown transport: {other} (expected 'local' or 'nats')"),
        }
    }
}

/// Groundstation configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the task set (JSON array of `{id, payoff}`).
    pub tasks_file: String,

    /// Number of workers in the fleet.
    pub worker_count: usize,

    /// Per-worker failure probabilities. A single supplied value is
    /// broadcast to the whole fleet; any other length mismatch is a
    /// configuration error caught at validation.
    pub failure_probabilities: Vec<f64>,

    /// Optimizer weight for the load-imbalance penalty.
    pub lambda: f64,

    /// Bound on optimizer solve time.
    pub solve_budget: Duration,

    /// Bound on the wait for worker results.
    pub results_timeout: Duration,

    /// Optional per-worker assigned-task capacity.
    pub worker_capacity: Option<usize>,

    /// Which transport variant to run over.
    pub transport: TransportKind,

    /// NATS broker URL (nats transport only).
    pub nats_url: String,

    /// Seed for worker simulation (local transport only; distributed
    /// satellites carry their own seed).
    pub rng_seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let tasks_file = std::env::var("FLEET_TASKS_FILE").context("FLEET_TASKS_FILE is required")?;

        let worker_count = std::env::var("FLEET_WORKER_COUNT")
            .unwrap_or_else(|_| "2".to_string())
            .parse()
            .context("invalid FLEET_WORKER_COUNT")?;

        let raw_probs = std::env::var("FLEET_FAILURE_PROBS").unwrap_or_else(|_| "0.1".to_string());
        let failure_probabilities = parse_failure_probs(&raw_probs, worker_count)?;

        let lambda = std::env::var("FLEET_LAMBDA")
            .unwrap_or_else(|_| fleet_model::DEFAULT_LAMBDA.to_string())
            .parse()
            .context("invalid FLEET_LAMBDA")?;

        let solve_budget = std::env::var("FLEET_SOLVE_BUDGET_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(fleet_model::DEFAULT_SOLVE_BUDGET);

        let results_timeout = std::env::var("FLEET_RESULTS_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(fleet_model::DEFAULT_RESULTS_TIMEOUT);

        let worker_capacity = std::env::var("FLEET_WORKER_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok());

        let transport = std::env::var("FLEET_TRANSPORT")
            .unwrap_or_else(|_| "local".to_string())
            .parse()?;

        let nats_url = std::env::var("FLEET_NATS_URL")
            .unwrap_or_else(|_| "nats://127.0.0.1:4222".to_string());

        let rng_seed = std::env::var("FLEET_RNG_SEED")
            .ok()
            .and_then(|s| s.parse().ok());

        let log_level = std::env::var("FLEET_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            tasks_file,
            worker_count,
            failure_probabilities,
            lambda,
            solve_budget,
            results_timeout,
            worker_capacity,
            transport,
            nats_url,
            rng_seed,
            log_level,
        })
    }

    /// Loads the task file and assembles the immutable run
    /// configuration handed to the coordinator.
    pub fn run_config(&self) -> Result<RunConfig> {
        let tasks = load_tasks(&self.tasks_file)?;

        let mut run = RunConfig::new(tasks, self.failure_probabilities.clone());
        run.worker_count = self.worker_count;
        run.lambda = self.lambda;
        run.solve_budget = self.solve_budget;
        run.results_timeout = self.results_timeout;
        run.rng_seed = self.rng_seed;
        run.worker_capacity = self.worker_capacity;
        Ok(run)
    }
}

/// Parses a comma-separated probability list. A single value is
/// broadcast to the whole fleet; other length mismatches are left for
/// `RunConfig::validate` to reject.
fn parse_failure_probs(raw: &str, worker_count: usize) -> Result<Vec<f64>> {
    let probs: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse().context("invalid FLEET_FAILURE_PROBS"))
        .collect::<Result<_>>()?;

    if probs.len() == 1 && worker_count > 1 {
        return Ok(vec![probs[0]; worker_count]);
    }
    Ok(probs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_probability_broadcast() {
        let probs = parse_failure_probs("0.1", 3).unwrap();
        assert_eq!(probs, vec![0.1, 0.1, 0.1]);
    }

    #[test]
    fn test_explicit_probability_list() {
        let probs = parse_failure_probs("0.05, 0.15", 2).unwrap();
        assert_eq!(probs, vec![0.05, 0.15]);
    }

    #[test]
    fn test_length_mismatch_passes_through_for_validation() {
        // Scenario: 2 workers but 3 probabilities. Parsing keeps the
        // list; RunConfig::validate rejects the run before allocation.
        let probs = parse_failure_probs("0.1,0.2,0.3", 2).unwrap();
        assert_eq!(probs.len(), 3);

        let run = {
            let mut run = RunConfig::new(
                vec![fleet_model::Task {
                    id: "a".parse().unwrap(),
                    payoff: 1.0,
                    resources: Vec::new(),
                    execution_time: None,
                }],
                probs,
            );
            run.worker_count = 2;
            run
        };
        assert!(run.validate().is_err());
    }

    #[test]
    fn test_garbage_probability_rejected() {
        assert!(parse_failure_probs("0.1,high", 2).is_err());
    }

    #[test]
    fn test_transport_kind_parse() {
        assert_eq!("local".parse::<TransportKind>().unwrap(), TransportKind::Local);
        assert_eq!("NATS".parse::<TransportKind>().unwrap(), TransportKind::Nats);
        assert!("mqtt".parse::<TransportKind>().is_err());
    }
}
