//! Allocation optimizer.
//!
//! Computes a task-to-worker assignment maximizing
//!
//! ```text
//! Σ payoff(t) · (1 − failure_probability(w(t)))  −  λ · (max load − min load)
//! ```
//!
//! i.e. total expected payoff minus a weighted load-imbalance penalty.
//! The imbalance measure is the range of per-worker assigned-task
//! counts: zero when all workers carry equal load, strictly positive
//! otherwise.
//!
//! Feasibility: a worker takes a task only while below its optional
//! capacity bound, and tasks sharing a resource id are never placed on
//! the same worker. Every task is assigned while feasibility permits; a
//! task is left unassigned only when no worker can take it (the default
//! capacity is unbounded, so a resource-free task set is always fully
//! placed).
//!
//! The search is a black box behind [`allocate`]: a deterministic greedy
//! seed followed by bounded local search. It always returns a feasible
//! assignment, even when the solve budget cuts the search short. The
//! seed and every completed improvement pass are deterministic; the
//! budget is consulted only between passes, so identical inputs yield
//! identical output whenever the search converges within budget (a few
//! passes in practice). Degenerate inputs (no tasks or no workers)
//! return an empty assignment, not an error.

mod search;

use std::time::{Duration, Instant};

use fleet_model::{Assignment, Task, Worker};
use tracing::{info, instrument};

use search::Search;

/// Tuning for one allocation call.
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    /// Weight of the load-imbalance penalty. Zero ignores balance
    /// entirely; large values force equal loads.
    pub lambda: f64,

    /// Bound on solve time. The search stops here and returns the best
    /// assignment found so far.
    pub solve_budget: Duration,

    /// Per-worker assigned-task capacity. `None` is unbounded.
    pub worker_capacity: Option<usize>,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            lambda: fleet_model::DEFAULT_LAMBDA,
            solve_budget: fleet_model::DEFAULT_SOLVE_BUDGET,
            worker_capacity: None,
        }
    }
}

/// Computes the assignment for one run.
#[instrument(skip_all, fields(tasks = tasks.len(), workers = workers.len(), lambda = config.lambda))]
pub fn allocate(tasks: &[Task], workers: &[Worker], config: &AllocatorConfig) -> Assignment {
    if tasks.is_empty() || workers.is_empty() {
        return Assignment::new();
    }

    let started = Instant::now();
    let deadline = started + config.solve_budget;

    let mut search = Search::new(tasks, workers, config.lambda, config.worker_capacity);
    search.seed();
    search.improve(deadline);

    let assignment = search.into_assignment();
    info!(
        assigned = assignment.assigned_count(),
        unassigned = tasks.len() - assignment.assigned_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Allocation complete"
    );
    assignment
}
