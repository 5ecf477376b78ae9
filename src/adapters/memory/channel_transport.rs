//! Channel Transport Adapter
//!
//! Routes session messages to per-connection `mpsc` channels. Socket tasks
//! drain their channel onto the wire; tests read it directly. Delivery never
//! waits: a full channel is reported as `Backpressure`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

use crate::domain::collaboration::WireMessage;
use crate::domain::foundation::ConnectionId;
use crate::ports::{CloseReason, MessageTransport, TransportError};

/// What a connection task receives.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Message(WireMessage),
    Close(CloseReason),
}

/// Registry of open connections, each backed by a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    connections: Arc<RwLock<HashMap<ConnectionId, mpsc::Sender<Outbound>>>>,
    channel_capacity: usize,
}

impl ChannelTransport {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Opens a channel for `connection_id` and returns its receiving end.
    pub async fn register(&self, connection_id: ConnectionId) -> mpsc::Receiver<Outbound> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        self.connections.write().await.insert(connection_id, tx);
        rx
    }

    pub async fn unregister(&self, connection_id: ConnectionId) {
        self.connections.write().await.remove(&connection_id);
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    async fn deliver(
        &self,
        connection_id: ConnectionId,
        outbound: Outbound,
    ) -> Result<(), TransportError> {
        let sender = self
            .connections
            .read()
            .await
            .get(&connection_id)
            .cloned()
            .ok_or(TransportError::ConnectionNotFound(connection_id))?;
        sender.try_send(outbound).map_err(|e| match e {
            TrySendError::Full(_) => TransportError::Backpressure(connection_id),
            TrySendError::Closed(_) => TransportError::ConnectionClosed(connection_id),
        })
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new(128)
    }
}

#[async_trait]
impl MessageTransport for ChannelTransport {
    async fn send(
        &self,
        connection_id: ConnectionId,
        message: WireMessage,
    ) -> Result<(), TransportError> {
        self.deliver(connection_id, Outbound::Message(message)).await
    }

    async fn close(
        &self,
        connection_id: ConnectionId,
        reason: CloseReason,
    ) -> Result<(), TransportError> {
        let result = self.deliver(connection_id, Outbound::Close(reason)).await;
        self.unregister(connection_id).await;
        result
    }
}
