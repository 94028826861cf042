//! Fleet groundstation.
//!
//! The groundstation is the sole decision-maker: it computes the task
//! assignment once per run, dispatches per-worker task lists over the
//! transport, collects results, and aggregates them into a run summary.
//! Workers never choose work.
//!
//! ## Architecture
//!
//! - **Allocator**: computes the assignment maximizing expected payoff
//!   minus a load-imbalance penalty, within a bounded solve time
//! - **Coordinator**: drives the run state machine from allocation
//!   through dispatch to aggregation
//! - **Aggregator**: folds execution results into global and per-worker
//!   summaries, idempotently

pub mod aggregator;
pub mod allocator;
pub mod config;
pub mod coordinator;
