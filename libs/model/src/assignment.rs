//! Task-to-worker assignment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{TaskId, WorkerId};

/// Mapping from task to the single worker that will execute it.
///
/// A task absent from the mapping is unassigned. Produced once by the
/// optimizer and never mutated afterward; iteration order is task-id
/// order, which keeps downstream dispatch deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    by_task: BTreeMap<TaskId, WorkerId>,
}

impl Assignment {
    /// Creates an empty assignment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns a task to a worker, replacing any previous placement.
    /// Each task maps to at most one worker by construction.
    pub fn assign(&mut self, task: TaskId, worker: WorkerId) {
        self.by_task.insert(task, worker);
    }

    /// Removes a task from the assignment, leaving it unassigned.
    pub fn unassign(&mut self, task: &TaskId) -> Option<WorkerId> {
        self.by_task.remove(task)
    }

    /// Returns the worker a task is assigned to, if any.
    #[must_use]
    pub fn worker_of(&self, task: &TaskId) -> Option<WorkerId> {
        self.by_task.get(task).copied()
    }

    /// Iterates the task ids assigned to one worker, in task-id order.
    pub fn tasks_for(&self, worker: WorkerId) -> impl Iterator<Item = &TaskId> {
        self.by_task
            .iter()
            .filter(move |(_, &w)| w == worker)
            .map(|(t, _)| t)
    }

    /// Number of tasks assigned to one worker.
    #[must_use]
    pub fn load_of(&self, worker: WorkerId) -> usize {
        self.by_task.values().filter(|&&w| w == worker).count()
    }

    /// Total number of assigned tasks.
    #[must_use]
    pub fn assigned_count(&self) -> usize {
        self.by_task.len()
    }

    /// Whether no task is assigned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_task.is_empty()
    }

    /// Iterates all `(task, worker)` pairs in task-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&TaskId, WorkerId)> {
        self.by_task.iter().map(|(t, &w)| (t, w))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(s: &str) -> TaskId {
        TaskId::new(s).unwrap()
    }

    #[test]
    fn test_assign_and_lookup() {
        let mut a = Assignment::new();
        a.assign(tid("t1"), WorkerId::new(1));
        a.assign(tid("t2"), WorkerId::new(2));
        a.assign(tid("t3"), WorkerId::new(1));

        assert_eq!(a.worker_of(&tid("t1")), Some(WorkerId::new(1)));
        assert_eq!(a.worker_of(&tid("t9")), None);
        assert_eq!(a.load_of(WorkerId::new(1)), 2);
        assert_eq!(a.assigned_count(), 3);
    }

    #[test]
    fn test_reassign_keeps_single_worker() {
        let mut a = Assignment::new();
        a.assign(tid("t1"), WorkerId::new(1));
        a.assign(tid("t1"), WorkerId::new(2));

        assert_eq!(a.assigned_count(), 1);
        assert_eq!(a.worker_of(&tid("t1")), Some(WorkerId::new(2)));
    }

    #[test]
    fn test_tasks_for_ordered_by_task_id() {
        let mut a = Assignment::new();
        a.assign(tid("b"), WorkerId::new(1));
        a.assign(tid("a"), WorkerId::new(1));
        a.assign(tid("c"), WorkerId::new(2));

        let tasks: Vec<_> = a.tasks_for(WorkerId::new(1)).cloned().collect();
        assert_eq!(tasks, vec![tid("a"), tid("b")]);
    }

    #[test]
    fn test_unassign() {
        let mut a = Assignment::new();
        a.assign(tid("t1"), WorkerId::new(1));
        assert_eq!(a.unassign(&tid("t1")), Some(WorkerId::new(1)));
        assert!(a.is_empty());
    }
}
