//! In-process data channel pair for loopback use and tests.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use super::DataChannel;
use crate::error::{KaiwaError, Result};

/// Client half, handed to the conversation driver.
#[derive(Debug)]
pub struct MemoryChannel {
    tx: Option<mpsc::UnboundedSender<String>>,
    rx: mpsc::UnboundedReceiver<String>,
    open_rx: watch::Receiver<bool>,
}

/// Service half, played by a test or a local responder.
#[derive(Debug)]
pub struct MemoryPeer {
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
    open_tx: watch::Sender<bool>,
}

/// Create a connected pair whose channel is not yet open.
pub fn pair() -> (MemoryChannel, MemoryPeer) {
    let (client_tx, peer_rx) = mpsc::unbounded_channel();
    let (peer_tx, client_rx) = mpsc::unbounded_channel();
    let (open_tx, open_rx) = watch::channel(false);
    (
        MemoryChannel {
            tx: Some(client_tx),
            rx: client_rx,
            open_rx,
        },
        MemoryPeer {
            tx: peer_tx,
            rx: peer_rx,
            open_tx,
        },
    )
}

/// Create a connected pair that is already open.
pub fn open_pair() -> (MemoryChannel, MemoryPeer) {
    let (channel, peer) = pair();
    peer.open();
    (channel, peer)
}

impl MemoryPeer {
    /// Mark the channel open, releasing `wait_open`.
    pub fn open(&self) {
        let _ = self.open_tx.send(true);
    }

    /// Deliver a raw text message to the client.
    pub fn send(&self, payload: impl Into<String>) -> Result<()> {
        self.tx
            .send(payload.into())
            .map_err(|_| KaiwaError::Transport("Memory channel client hung up".into()))
    }

    pub fn send_json(&self, value: &Value) -> Result<()> {
        self.send(value.to_string())
    }

    /// Next message sent by the client, `None` once the client closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Next message sent by the client, parsed as JSON. Non-JSON messages are skipped.
    pub async fn recv_json(&mut self) -> Option<Value> {
        while let Some(raw) = self.rx.recv().await {
            if let Ok(value) = serde_json::from_str(&raw) {
                return Some(value);
            }
        }
        None
    }

    /// Drain everything the client has sent so far without waiting.
    pub fn drain_json(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(raw) = self.rx.try_recv() {
            if let Ok(value) = serde_json::from_str(&raw) {
                out.push(value);
            }
        }
        out
    }
}

#[async_trait]
impl DataChannel for MemoryChannel {
    async fn wait_open(&mut self) -> Result<()> {
        self.open_rx
            .wait_for(|open| *open)
            .await
            .map(|_| ())
            .map_err(|_| KaiwaError::Transport("Memory channel peer dropped before open".into()))
    }

    async fn send(&mut self, payload: String) -> Result<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| KaiwaError::Transport("Memory channel is closed".into()))?;
        tx.send(payload)
            .map_err(|_| KaiwaError::Transport("Memory channel peer hung up".into()))
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<()> {
        self.tx = None;
        self.rx.close();
        Ok(())
    }
}
