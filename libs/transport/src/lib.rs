//! # fleet-transport
//!
//! Bidirectional message channels between groundstation and fleet,
//! polymorphic over two variants:
//!
//! - [`LocalTransport`]: in-memory FIFO queues for a single-process run.
//!   Exactly-once, in-order delivery, no loss.
//! - [`NatsTransport`]: a NATS publish/subscribe client for distributed
//!   runs. Delivery is at least once and unordered across workers, so
//!   consumers must tolerate duplicates.
//!
//! Both variants carry the same [`Message`](fleet_protocol::Message)
//! records over the same [`Topic`](fleet_protocol::Topic) namespace;
//! dispatch and executor logic never branches on which variant is
//! active.

mod error;
mod local;
mod nats;

use std::time::Duration;

use async_trait::async_trait;
use fleet_protocol::{Message, Topic};

pub use error::TransportError;
pub use local::LocalTransport;
pub use nats::NatsTransport;

/// A bidirectional message channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Declares interest in a topic before the first receive. Receivers
    /// call this at startup so no dispatch is published into the void.
    async fn subscribe(&self, topic: &Topic) -> Result<(), TransportError>;

    /// Sends one message to a topic.
    async fn send(&self, topic: &Topic, message: &Message) -> Result<(), TransportError>;

    /// Receives the next message from a topic, waiting up to `timeout`.
    ///
    /// Returns `Ok(None)` when no message arrived within the timeout.
    /// Malformed payloads are logged and skipped within the timeout
    /// window, never surfaced as errors. A closed channel is an error:
    /// nothing can ever be received from it again.
    async fn recv(
        &self,
        topic: &Topic,
        timeout: Duration,
    ) -> Result<Option<Message>, TransportError>;
}
