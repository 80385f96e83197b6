//! PushChannel trait — real-time client updates, keyed by chat ID.
//!
//! Delivery is fire-and-forget with at-most-once semantics: failures are
//! logged by callers, never retried, and (except at initial message
//! creation) never abort the turn.

use crate::error::PushError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// An event pushed to clients watching a group (chat).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    /// Group key — the chat ID whose clients should receive this
    pub group: String,

    /// Event name (e.g. "message_created", "message_updated")
    pub event: String,

    /// Event payload
    pub payload: serde_json::Value,
}

/// The core PushChannel trait.
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// The channel name (e.g. "broadcast", "signalr").
    fn name(&self) -> &str;

    /// Send an event to all clients in a group. At-most-once delivery.
    async fn send(
        &self,
        group: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> std::result::Result<(), PushError>;
}

/// A broadcast-based push channel.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub; subscribers
/// receive every event and filter by group themselves.
pub struct BroadcastPush {
    sender: broadcast::Sender<Arc<PushEvent>>,
}

impl BroadcastPush {
    /// Create a new push hub with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive all pushed events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<PushEvent>> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastPush {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl PushChannel for BroadcastPush {
    fn name(&self) -> &str {
        "broadcast"
    }

    async fn send(
        &self,
        group: &str,
        event: &str,
        payload: serde_json::Value,
    ) -> std::result::Result<(), PushError> {
        // No subscribers is fine — at-most-once means nobody was listening.
        let _ = self.sender.send(Arc::new(PushEvent {
            group: group.to_string(),
            event: event.to_string(),
            payload,
        }));
        Ok(())
    }
}

/// A push channel that drops everything. Useful for headless runs.
pub struct NoopPush;

#[async_trait]
impl PushChannel for NoopPush {
    fn name(&self) -> &str {
        "noop"
    }

    async fn send(
        &self,
        _group: &str,
        _event: &str,
        _payload: serde_json::Value,
    ) -> std::result::Result<(), PushError> {
        Ok(())
    }
}
