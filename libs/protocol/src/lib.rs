//! # fleet-protocol
//!
//! Wire messages and topic naming for the fleet tasking system.
//!
//! ## Design Principles
//!
//! - Messages are structured records with named fields, encoded as
//!   self-describing JSON text
//! - Delivery across a channel preserves message content exactly;
//!   roundtrip is lossless
//! - Decode failures are recoverable: receivers log and discard a
//!   malformed payload, they do not abort the run
//! - The same messages flow over both transport variants, so the
//!   dispatch and executor logic never branches on the wire

mod error;
mod message;
mod topic;

pub use error::ProtocolError;
pub use message::{EndOfDispatch, Message, ResultReport, TaskDispatch};
pub use topic::Topic;
