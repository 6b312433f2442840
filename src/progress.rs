//! Process-wide progress broadcast
//!
//! Progress is not tied to the request that started provisioning: every
//! subscriber sees every event, in the order the worker emitted them.
//! Publishing never waits on subscribers; a subscriber that falls more than
//! the channel capacity behind skips the oldest events.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::config::PROGRESS_CHANNEL_CAPACITY;

/// Opaque progress payload forwarded verbatim from the worker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProgressEvent(pub Value);

#[derive(Debug, Clone)]
pub struct ProgressBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressBus {
    pub fn new() -> Self {
        Self::with_capacity(PROGRESS_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ProgressEvent) {
        // Send only fails when nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new()
    }
}
