//! Error types for message handling.

use thiserror::Error;

/// Errors that can occur when encoding or decoding messages.
#[derive(Debug, Error, Clone)]
pub enum ProtocolError {
    /// The payload could not be decoded as a known message.
    #[error("failed to decode message: {0}")]
    Decode(String),

    /// The message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(String),
}
