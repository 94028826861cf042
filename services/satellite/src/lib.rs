//! Satellite worker for the fleet tasking system.
//!
//! A satellite never chooses work. It receives the task list the
//! groundstation assigned to it, simulates each task with its configured
//! failure probability, and streams one result per task back over the
//! transport.

pub mod config;
pub mod executor;
