//! Message transport port - ordered delivery to one connection.
//!
//! Inbound messages do not go through this port; transports hand them to the
//! session that owns the connection.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::collaboration::WireMessage;
use crate::domain::foundation::ConnectionId;

/// Why a connection is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Session ended or participant left.
    Normal,
    /// No message within the idle window.
    IdleTimeout,
    /// Outbound messages piled up faster than the participant read them.
    Lagging,
}

impl CloseReason {
    /// Websocket close code.
    pub fn code(&self) -> u16 {
        match self {
            CloseReason::Normal => 1000,
            CloseReason::IdleTimeout => 1001,
            CloseReason::Lagging => 1008,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CloseReason::Normal => "session closed",
            CloseReason::IdleTimeout => "idle timeout",
            CloseReason::Lagging => "not keeping up",
        }
    }
}

/// Errors raised while delivering messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    #[error("Connection closed: {0}")]
    ConnectionClosed(ConnectionId),

    #[error("Connection {0} is not keeping up")]
    Backpressure(ConnectionId),
}

/// Port for sending session messages to connected participants.
///
/// Messages to one connection must arrive in send order. Implementations
/// must not wait for a slow receiver; they return `Backpressure` instead.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn send(
        &self,
        connection_id: ConnectionId,
        message: WireMessage,
    ) -> Result<(), TransportError>;

    async fn close(
        &self,
        connection_id: ConnectionId,
        reason: CloseReason,
    ) -> Result<(), TransportError>;
}
