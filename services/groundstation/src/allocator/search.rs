//! Greedy seed plus bounded local search over task placements.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::time::Instant;

use fleet_model::{Assignment, Task, Worker};
use tracing::debug;

/// Two objective values closer than this are a tie. Ties never trigger
/// a move, which keeps the search deterministic and terminating.
const EPS: f64 = 1e-9;

pub(super) struct Search<'a> {
    tasks: &'a [Task],
    workers: &'a [Worker],
    lambda: f64,
    capacity: usize,
    /// Task index → worker index; `None` is unassigned.
    placement: Vec<Option<usize>>,
    /// Assigned-task count per worker index.
    loads: Vec<usize>,
    /// Resources in use per worker index. Exclusivity invariant: each
    /// resource is held by at most one task on a given worker.
    resource_use: Vec<HashSet<u32>>,
}

impl<'a> Search<'a> {
    pub(super) fn new(
        tasks: &'a [Task],
        workers: &'a [Worker],
        lambda: f64,
        capacity: Option<usize>,
    ) -> Self {
        Self {
            tasks,
            workers,
            lambda,
            capacity: capacity.unwrap_or(usize::MAX),
            placement: vec![None; tasks.len()],
            loads: vec![0; workers.len()],
            resource_use: vec![HashSet::new(); workers.len()],
        }
    }

    /// Greedy construction: tasks in descending payoff (ties by
    /// ascending task id, which is a total order since ids are unique),
    /// each placed on the feasible worker with the best objective delta
    /// (ties to the lowest worker id). A task is left unassigned only
    /// when no worker can take it: all at capacity, or every worker
    /// already holds one of its resources.
    pub(super) fn seed(&mut self) {
        let mut order: Vec<usize> = (0..self.tasks.len()).collect();
        order.sort_by(|&a, &b| {
            self.tasks[b]
                .payoff
                .partial_cmp(&self.tasks[a].payoff)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.tasks[a].id.cmp(&self.tasks[b].id))
        });

        for task in order {
            if let Some(worker) = self.best_worker_for(task) {
                self.place(task, worker);
            }
        }
    }

    /// Local search: single-task relocations and pairwise swaps, strict
    /// improvement only, fixed scan order. Passes run whole; the solve
    /// budget is consulted only between passes, so a budget cut never
    /// leaves a half-scanned pass behind and identical inputs take
    /// identical moves within every completed pass. Stops when a full
    /// pass finds no improving move or the deadline passes; the
    /// incumbent is feasible at every point, so cutting the search
    /// short is safe.
    pub(super) fn improve(&mut self, deadline: Instant) {
        let mut passes = 0usize;
        loop {
            if Instant::now() >= deadline {
                debug!(passes, "Solve budget exhausted");
                break;
            }

            let mut improved = false;

            for task in 0..self.tasks.len() {
                let Some(current) = self.placement[task] else {
                    continue;
                };
                for worker in 0..self.workers.len() {
                    if worker == current || !self.fits(task, worker) {
                        continue;
                    }
                    if self.relocation_delta(task, current, worker) > EPS {
                        self.remove(task, current);
                        self.place(task, worker);
                        improved = true;
                        break;
                    }
                }
            }

            for first in 0..self.tasks.len() {
                let Some(w1) = self.placement[first] else {
                    continue;
                };
                for second in (first + 1)..self.tasks.len() {
                    let Some(w2) = self.placement[second] else {
                        continue;
                    };
                    if w1 == w2 || !self.swap_fits(first, w1, second, w2) {
                        continue;
                    }
                    if self.swap_delta(first, w1, second, w2) > EPS {
                        self.remove(first, w1);
                        self.remove(second, w2);
                        self.place(first, w2);
                        self.place(second, w1);
                        improved = true;
                        break;
                    }
                }
            }

            passes += 1;
            if !improved {
                debug!(passes, "Local search converged");
                break;
            }
        }
    }

    pub(super) fn into_assignment(self) -> Assignment {
        let mut assignment = Assignment::new();
        for (task, placed) in self.placement.iter().enumerate() {
            if let Some(worker) = placed {
                assignment.assign(self.tasks[task].id.clone(), self.workers[*worker].id);
            }
        }
        assignment
    }

    fn place(&mut self, task: usize, worker: usize) {
        self.placement[task] = Some(worker);
        self.loads[worker] += 1;
        for &r in &self.tasks[task].resources {
            self.resource_use[worker].insert(r);
        }
    }

    fn remove(&mut self, task: usize, worker: usize) {
        self.placement[task] = None;
        self.loads[worker] -= 1;
        for &r in &self.tasks[task].resources {
            self.resource_use[worker].remove(&r);
        }
    }

    /// Whether `worker` can take `task`: below capacity and holding
    /// none of the task's resources.
    fn fits(&self, task: usize, worker: usize) -> bool {
        self.loads[worker] < self.capacity
            && self.tasks[task]
                .resources
                .iter()
                .all(|r| !self.resource_use[worker].contains(r))
    }

    /// Whether exchanging the workers of two placed tasks keeps
    /// resource exclusivity. Loads are unchanged, so capacity cannot be
    /// violated; a resource held on the destination is only acceptable
    /// when it is held by the task leaving it.
    fn swap_fits(&self, first: usize, w1: usize, second: usize, w2: usize) -> bool {
        let clear = |incoming: usize, outgoing: usize, worker: usize| {
            self.tasks[incoming].resources.iter().all(|r| {
                !self.resource_use[worker].contains(r)
                    || self.tasks[outgoing].resources.contains(r)
            })
        };
        clear(first, second, w2) && clear(second, first, w1)
    }

    /// Best worker for an unplaced task: highest objective delta among
    /// feasible workers, ties to the lowest index.
    fn best_worker_for(&self, task: usize) -> Option<usize> {
        let imbalance_before = self.imbalance(&self.loads);
        let mut best: Option<usize> = None;
        let mut best_delta = f64::NEG_INFINITY;

        for worker in 0..self.workers.len() {
            if !self.fits(task, worker) {
                continue;
            }
            let mut loads = self.loads.clone();
            loads[worker] += 1;
            let delta = self.expected_payoff(task, worker)
                - self.lambda * (self.imbalance(&loads) - imbalance_before);
            if delta > best_delta + EPS {
                best = Some(worker);
                best_delta = delta;
            }
        }
        best
    }

    /// Objective change from moving `task` from `current` to `worker`.
    fn relocation_delta(&self, task: usize, current: usize, worker: usize) -> f64 {
        let gain = self.expected_payoff(task, worker) - self.expected_payoff(task, current);

        let imbalance_before = self.imbalance(&self.loads);
        let mut loads = self.loads.clone();
        loads[current] -= 1;
        loads[worker] += 1;

        gain - self.lambda * (self.imbalance(&loads) - imbalance_before)
    }

    /// Objective change from swapping the workers of two tasks. Loads
    /// are unchanged, so only the expected payoff moves.
    fn swap_delta(&self, first: usize, w1: usize, second: usize, w2: usize) -> f64 {
        self.expected_payoff(first, w2) + self.expected_payoff(second, w1)
            - self.expected_payoff(first, w1)
            - self.expected_payoff(second, w2)
    }

    fn expected_payoff(&self, task: usize, worker: usize) -> f64 {
        self.tasks[task].payoff * (1.0 - self.workers[worker].failure_probability)
    }

    /// Load-imbalance measure: range of per-worker loads. Zero iff all
    /// workers carry equal load.
    fn imbalance(&self, loads: &[usize]) -> f64 {
        match (loads.iter().max(), loads.iter().min()) {
            (Some(&max), Some(&min)) => (max - min) as f64,
            _ => 0.0,
        }
    }
}
