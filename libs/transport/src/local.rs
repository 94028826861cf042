//! In-memory FIFO transport for single-process runs.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use fleet_model::WorkerId;
use fleet_protocol::{Message, Topic};
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::warn;

use crate::{Transport, TransportError};

struct LocalChannel {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl LocalChannel {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

/// In-memory transport: one FIFO queue per topic.
///
/// Delivery is exactly-once and in-order within a topic, with no loss.
/// Messages still cross the wire codec, so content fidelity matches the
/// distributed variant byte for byte. Senders are safe to use
/// concurrently; the receiving half of each topic is serialized behind a
/// lock.
pub struct LocalTransport {
    channels: HashMap<Topic, LocalChannel>,
}

impl LocalTransport {
    /// Builds the channel set for a fleet: one task queue per worker
    /// plus the shared results queue.
    #[must_use]
    pub fn new(workers: &[WorkerId]) -> Self {
        let mut channels = HashMap::new();
        channels.insert(Topic::Results, LocalChannel::new());
        for &worker in workers {
            channels.insert(Topic::Tasks(worker), LocalChannel::new());
        }
        Self { channels }
    }

    fn channel(&self, topic: &Topic) -> Result<&LocalChannel, TransportError> {
        self.channels
            .get(topic)
            .ok_or_else(|| TransportError::UnknownTopic {
                topic: topic.subject(),
            })
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn subscribe(&self, topic: &Topic) -> Result<(), TransportError> {
        // Queues exist for the whole run; subscribing just checks the
        // topic is one of ours.
        self.channel(topic).map(|_| ())
    }

    async fn send(&self, topic: &Topic, message: &Message) -> Result<(), TransportError> {
        let payload = message.to_bytes()?;
        self.channel(topic)?
            .tx
            .send(payload)
            .map_err(|_| TransportError::Closed {
                topic: topic.subject(),
            })
    }

    async fn recv(
        &self,
        topic: &Topic,
        timeout: Duration,
    ) -> Result<Option<Message>, TransportError> {
        let deadline = Instant::now() + timeout;
        let mut rx = self.channel(topic)?.rx.lock().await;

        loop {
            let payload = match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(payload)) => payload,
                Ok(None) => {
                    return Err(TransportError::Closed {
                        topic: topic.subject(),
                    })
                }
                Err(_) => return Ok(None),
            };

            match Message::from_bytes(&payload) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    warn!(topic = %topic, error = %e, "Discarding malformed message");
                }
            }
        }
    }
}
