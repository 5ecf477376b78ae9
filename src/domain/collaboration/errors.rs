//! Collaboration session error types.

use crate::domain::foundation::{ChartId, ConnectionId, DomainError, ErrorCode};

use super::MessageType;

/// Errors raised while processing session messages.
///
/// None of these end a session; callers log them and keep going.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Payload could not be encoded or decoded.
    MalformedMessage(String),
    /// Message addressed to another chart.
    ChartMismatch { expected: ChartId, actual: ChartId },
    /// Message type not allowed before the connection is active.
    NotActive(MessageType),
    /// Message type the receiver never accepts.
    Unexpected(MessageType),
    /// Connection is not registered with the host.
    UnknownConnection(ConnectionId),
    /// Sender may not perform this change.
    Forbidden(String),
    /// Incoming structure failed validation.
    StructureRejected(Vec<String>),
    /// Submitted user failed validation.
    UserRejected { username: String, reasons: Vec<String> },
    /// Connection state transition was invalid.
    InvalidState(String),
}

impl SessionError {
    pub fn malformed(message: impl Into<String>) -> Self {
        SessionError::MalformedMessage(message.into())
    }
    pub fn forbidden(message: impl Into<String>) -> Self {
        SessionError::Forbidden(message.into())
    }
    pub fn invalid_state(message: impl Into<String>) -> Self {
        SessionError::InvalidState(message.into())
    }
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::MalformedMessage(_) => ErrorCode::ValidationFailed,
            SessionError::ChartMismatch { .. } => ErrorCode::ChartNotFound,
            SessionError::NotActive(_) => ErrorCode::ConnectionNotActive,
            SessionError::Unexpected(_) => ErrorCode::ValidationFailed,
            SessionError::UnknownConnection(_) => ErrorCode::ConnectionLost,
            SessionError::Forbidden(_) => ErrorCode::Forbidden,
            SessionError::StructureRejected(_) => ErrorCode::StructureInvalid,
            SessionError::UserRejected { .. } => ErrorCode::PreferenceInvalid,
            SessionError::InvalidState(_) => ErrorCode::InvalidStateTransition,
        }
    }
    pub fn message(&self) -> String {
        match self {
            SessionError::MalformedMessage(msg) => format!("Malformed message: {}", msg),
            SessionError::ChartMismatch { expected, actual } => {
                format!("Message for chart {} sent to session of chart {}", actual, expected)
            }
            SessionError::NotActive(kind) => {
                format!("'{}' received before the connection was initialised", kind)
            }
            SessionError::Unexpected(kind) => format!("'{}' is not accepted here", kind),
            SessionError::UnknownConnection(id) => format!("Unknown connection: {}", id),
            SessionError::Forbidden(msg) => format!("Permission denied: {}", msg),
            SessionError::StructureRejected(problems) => {
                format!("Chart structure rejected: {}", problems.join("; "))
            }
            SessionError::UserRejected { username, reasons } => {
                format!("Preferences of '{}' rejected: {}", username, reasons.join("; "))
            }
            SessionError::InvalidState(msg) => format!("Invalid state: {}", msg),
        }
    }
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SessionError {}

impl From<SessionError> for DomainError {
    fn from(err: SessionError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
