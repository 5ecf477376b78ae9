//! WebSocket upgrade handler for chart sessions.
//!
//! Connection lifecycle:
//! 1. Check the chart exists and the password matches
//! 2. Upgrade to WebSocket
//! 3. Register the connection and join the host session
//! 4. Relay frames until either side closes or the socket goes idle
//! 5. Tell the host the connection is gone

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use secrecy::SecretString;
use serde::Deserialize;

use crate::adapters::memory::{ChannelTransport, Outbound};
use crate::application::{HostHandle, SessionRegistry};
use crate::domain::collaboration::WireMessage;
use crate::domain::foundation::{ChartId, ConnectionId, DomainError, ErrorCode};
use crate::ports::CloseReason;

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub sessions: Arc<SessionRegistry>,
    pub transport: ChannelTransport,
    pub idle_timeout: Duration,
}

impl WebSocketState {
    pub fn new(sessions: Arc<SessionRegistry>, transport: ChannelTransport, idle_timeout: Duration) -> Self {
        Self {
            sessions,
            transport,
            idle_timeout,
        }
    }
}

/// Query string of the join request.
#[derive(Deserialize)]
pub struct JoinParams {
    pub username: String,
    pub password: SecretString,
}

/// Handle WebSocket upgrade requests for a chart session.
///
/// Route: `GET /charts/:chart_id/session?username=..&password=..`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(chart_id): Path<String>,
    Query(params): Query<JoinParams>,
    State(state): State<WebSocketState>,
) -> Response {
    let chart_id: ChartId = match chart_id.parse() {
        Ok(id) => id,
        Err(_) => return error_response(DomainError::validation("chart_id", "Invalid chart ID")),
    };
    if params.username.trim().is_empty() {
        return error_response(DomainError::validation("username", "Username is required"));
    }

    let host = match state.sessions.join(chart_id, &params.password).await {
        Ok(host) => host,
        Err(e) => return error_response(e.into()),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, host, params.username, state))
}

/// Runs for the lifetime of one connection.
async fn handle_socket(socket: WebSocket, host: HostHandle, username: String, state: WebSocketState) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = ConnectionId::new();
    let mut outbound = state.transport.register(connection_id).await;

    if let Err(e) = host.connect(connection_id, username.clone()).await {
        let error = DomainError::from(e);
        tracing::debug!(connection_id = %connection_id, code = %error.code, error = %error, "Join refused");
        state.transport.unregister(connection_id).await;
        let _ = sender.send(close_message(CloseReason::Normal)).await;
        return;
    }

    let mut send_task = tokio::spawn(async move {
        while let Some(item) = outbound.recv().await {
            match item {
                Outbound::Message(message) => {
                    let text = match message.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(connection_id = %connection_id, error = %e, "Dropping unencodable message");
                            continue;
                        }
                    };
                    if let Err(e) = sender.send(Message::Text(text)).await {
                        tracing::debug!(connection_id = %connection_id, "Send error, closing connection: {}", e);
                        return true;
                    }
                }
                Outbound::Close(reason) => {
                    let _ = sender.send(close_message(reason)).await;
                    return false;
                }
            }
        }
        false
    });

    let idle_timeout = state.idle_timeout;
    let inbound_host = host.clone();
    let mut recv_task = tokio::spawn(async move {
        loop {
            let frame = match tokio::time::timeout(idle_timeout, receiver.next()).await {
                Ok(Some(frame)) => frame,
                Ok(None) => return false,
                Err(_) => {
                    tracing::info!(connection_id = %connection_id, "Socket idle, closing");
                    return true;
                }
            };
            match frame {
                Ok(Message::Text(text)) => match WireMessage::from_json(&text) {
                    Ok(message) => {
                        if inbound_host.inbound(connection_id, message).await.is_err() {
                            return false;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(connection_id = %connection_id, error = %e, "Unparseable frame");
                    }
                },
                Ok(Message::Binary(_)) => {
                    tracing::warn!(connection_id = %connection_id, "Received unsupported binary message");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %connection_id, "Client sent close frame");
                    return false;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, "Receive error: {}", e);
                    return true;
                }
            }
        }
    });

    // The flag reports whether the connection ended abnormally.
    let failed = tokio::select! {
        result = &mut send_task => {
            recv_task.abort();
            result.unwrap_or(true)
        }
        result = &mut recv_task => {
            send_task.abort();
            result.unwrap_or(true)
        }
    };

    let _ = host.disconnect(connection_id, failed).await;
    state.transport.unregister(connection_id).await;
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationFailed
        | ErrorCode::StructureInvalid
        | ErrorCode::PreferenceInvalid => StatusCode::BAD_REQUEST,
        ErrorCode::ChartNotFound => StatusCode::NOT_FOUND,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::InvalidStateTransition | ErrorCode::ConnectionNotActive => StatusCode::CONFLICT,
        ErrorCode::ConnectionLost => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::StorageError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error body with the status matching its code.
fn error_response(error: DomainError) -> Response {
    (status_for(error.code), Json(error)).into_response()
}

fn close_message(reason: CloseReason) -> Message {
    Message::Close(Some(CloseFrame {
        code: reason.code(),
        reason: reason.description().into(),
    }))
}

/// Create axum router for the session endpoint.
pub fn websocket_router() -> axum::Router<WebSocketState> {
    use axum::routing::get;

    axum::Router::new().route("/charts/:chart_id/session", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_message_carries_code() {
        match close_message(CloseReason::Normal) {
            Message::Close(Some(frame)) => assert_eq!(frame.code, 1000),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn repository_errors_map_to_statuses() {
        let id = ChartId::new();
        let not_found = error_response(crate::ports::RepositoryError::NotFound(id).into());
        let bad_password = error_response(crate::ports::RepositoryError::InvalidPassword(id).into());
        let storage = error_response(crate::ports::RepositoryError::Storage("disk".into()).into());

        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(bad_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_input_is_bad_request() {
        let response = error_response(DomainError::validation("username", "Username is required"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn websocket_router_creates_route() {
        let _router = websocket_router();
    }
}
