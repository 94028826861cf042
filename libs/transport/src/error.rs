//! Transport error types.

use fleet_protocol::ProtocolError;
use thiserror::Error;

/// Errors from a transport channel.
///
/// Loss of the transport itself is fatal to a run: no result can ever be
/// recovered over a dead channel. Malformed inbound payloads are *not*
/// errors; receivers discard them and keep waiting.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The broker could not be reached.
    #[error("failed to connect to broker: {0}")]
    Connect(String),

    /// A subscription could not be established.
    #[error("failed to subscribe to {topic}: {reason}")]
    Subscribe { topic: String, reason: String },

    /// A publish was not accepted.
    #[error("failed to publish to {topic}: {reason}")]
    Publish { topic: String, reason: String },

    /// The channel closed and will never deliver again.
    #[error("channel closed: {topic}")]
    Closed { topic: String },

    /// The topic does not exist on this transport.
    #[error("unknown topic: {topic}")]
    UnknownTopic { topic: String },

    /// An outbound message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
