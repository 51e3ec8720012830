//! Event observation.

use std::sync::Mutex;

use async_trait::async_trait;
use redress_types::AgentEvent;
use tokio::sync::broadcast;

/// Receives every [`AgentEvent`] the loop emits, in order.
///
/// Sink failures are the caller's to log and ignore; they never interrupt a
/// run.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn on_event(&self, event: AgentEvent) -> anyhow::Result<()>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn on_event(&self, _event: AgentEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Fans events out on a tokio broadcast channel so a host UI can subscribe.
/// Send failures (no subscribers) are ignored.
pub struct BroadcastSink {
    sender: broadcast::Sender<AgentEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn from_sender(sender: broadcast::Sender<AgentEvent>) -> Self {
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    async fn on_event(&self, event: AgentEvent) -> anyhow::Result<()> {
        let _ = self.sender.send(event);
        Ok(())
    }
}

/// Collects events into memory, for tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<AgentEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn on_event(&self, event: AgentEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
