//! Message definitions and the JSON codec.

use fleet_model::{TaskId, WorkerId};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// One task pushed to a worker. Sent on that worker's task topic, one
/// message per assigned task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDispatch {
    pub task_id: TaskId,
    pub payoff: f64,
    pub worker_id: WorkerId,
}

/// Dispatch-complete sentinel, sent on a worker's task topic after its
/// last task. A worker with zero assigned tasks receives only this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndOfDispatch {
    pub worker_id: WorkerId,
    /// How many `dispatch` messages preceded this sentinel, so the
    /// worker can cross-check its batch.
    pub task_count: usize,
}

/// One execution outcome reported by a worker on the shared results
/// topic, streamed as each task completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultReport {
    pub task_id: TaskId,
    pub worker_id: WorkerId,
    pub succeeded: bool,
    pub payoff_earned: f64,
}

/// Every message that crosses a transport, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    Dispatch(TaskDispatch),
    EndOfDispatch(EndOfDispatch),
    Result(ResultReport),
}

impl Message {
    /// Encodes the message as self-describing JSON text.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Decodes a message from its wire form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }
}
