//! # fleet-model
//!
//! Task and fleet data model for the fleet tasking system.
//!
//! ## Design Principles
//!
//! - Tasks and workers are immutable descriptions, loaded once per run
//! - IDs are typed to prevent mixing tasks and workers
//! - Configuration is validated fail-fast, before any allocation starts
//! - Derived values (assignments, summaries) are never mutated after
//!   they are produced

mod assignment;
mod config;
mod error;
mod fleet;
mod id;
mod result;
mod summary;

pub use assignment::Assignment;
pub use config::{
    RunConfig, DEFAULT_LAMBDA, DEFAULT_RESULTS_TIMEOUT, DEFAULT_SOLVE_BUDGET,
};
pub use error::ConfigError;
pub use fleet::{load_tasks, Task, Worker};
pub use id::{IdError, TaskId, WorkerId};
pub use result::{ExecutionResult, Outcome};
pub use summary::{RunSummary, WorkerSummary};
