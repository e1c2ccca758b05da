use crate::transport::SignalSink;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use huddle_core::{ClientEvent, ServerEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{error, info, warn};

/// WebSocket connection to the relay.
///
/// Outbound events go through one queue and one writer task, so they reach the
/// relay in the order [`SignalSink::send`] was called.
pub struct RelayClient {
    tx: mpsc::UnboundedSender<ClientEvent>,
    recv_task: JoinHandle<()>,
}

impl RelayClient {
    /// Connects to `url` (e.g. `ws://host:4001/ws`). The receiver yields every
    /// server event and closes when the connection drops.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>)> {
        let (ws, _resp) = connect_async(url)
            .await
            .with_context(|| format!("connect to relay at {url}"))?;
        info!("Connected to relay {}", url);

        let (mut sink, mut stream) = ws.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        // Ends once every sender is dropped and the queue is flushed.
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize client event: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let recv_task = tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ServerEvent>(text.as_str()) {
                        Ok(event) => {
                            if event_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid server event: {}", e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            info!("Relay connection closed");
        });

        Ok((Self { tx, recv_task }, event_rx))
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        self.recv_task.abort();
    }
}

#[async_trait]
impl SignalSink for RelayClient {
    async fn send(&self, event: ClientEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| anyhow!("relay connection closed"))
    }
}
