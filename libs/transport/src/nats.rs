//! NATS publish/subscribe transport for distributed runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fleet_protocol::{Message, Topic};
use futures_util::StreamExt;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{Transport, TransportError};

/// NATS-backed transport.
///
/// The groundstation publishes to one task subject per worker identity
/// (`fleet.tasks.<id>`) and every worker publishes to the shared results
/// subject (`fleet.results`). Delivery is acknowledged by the broker and
/// may duplicate; consumers must be idempotent. Ordering is preserved
/// per publisher but not across workers.
pub struct NatsTransport {
    client: async_nats::Client,
    subscriptions: Mutex<HashMap<Topic, Arc<Mutex<async_nats::Subscriber>>>>,
}

impl NatsTransport {
    /// Connects to the broker. An unreachable broker is fatal to the
    /// run: nothing can be dispatched or recovered without it.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        debug!(url, "Connected to NATS broker");

        Ok(Self {
            client,
            subscriptions: Mutex::new(HashMap::new()),
        })
    }

    async fn subscription(
        &self,
        topic: &Topic,
    ) -> Result<Arc<Mutex<async_nats::Subscriber>>, TransportError> {
        let mut subs = self.subscriptions.lock().await;
        if let Some(sub) = subs.get(topic) {
            return Ok(Arc::clone(sub));
        }

        let sub = self
            .client
            .subscribe(topic.subject())
            .await
            .map_err(|e| TransportError::Subscribe {
                topic: topic.subject(),
                reason: e.to_string(),
            })?;
        debug!(topic = %topic, "Subscribed");

        let sub = Arc::new(Mutex::new(sub));
        subs.insert(*topic, Arc::clone(&sub));
        Ok(sub)
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn subscribe(&self, topic: &Topic) -> Result<(), TransportError> {
        self.subscription(topic).await.map(|_| ())
    }

    async fn send(&self, topic: &Topic, message: &Message) -> Result<(), TransportError> {
        let payload = message.to_bytes()?;
        self.client
            .publish(topic.subject(), payload.into())
            .await
            .map_err(|e| TransportError::Publish {
                topic: topic.subject(),
                reason: e.to_string(),
            })?;
        // Flush so the dispatch is on the broker before we move on.
        self.client
            .flush()
            .await
            .map_err(|e| TransportError::Publish {
                topic: topic.subject(),
                reason: e.to_string(),
            })
    }

    async fn recv(
        &self,
        topic: &Topic,
        timeout: Duration,
    ) -> Result<Option<Message>, TransportError> {
        let deadline = Instant::now() + timeout;
        let sub = self.subscription(topic).await?;
        let mut sub = sub.lock().await;

        loop {
            let inbound = match tokio::time::timeout_at(deadline, sub.next()).await {
                Ok(Some(inbound)) => inbound,
                Ok(None) => {
                    return Err(TransportError::Closed {
                        topic: topic.subject(),
                    })
                }
                Err(_) => return Ok(None),
            };

            match Message::from_bytes(&inbound.payload) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    warn!(topic = %topic, error = %e, "Discarding malformed message");
                }
            }
        }
    }
}
