use anyhow::Result;
use async_trait::async_trait;
use huddle_core::ClientEvent;

/// Outbound half of the relay connection. Events must leave in call order.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send(&self, event: ClientEvent) -> Result<()>;
}
