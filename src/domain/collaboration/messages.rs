//! Session protocol messages.
//!
//! On the wire every message is a JSON object `{type, data, chartId}`:
//!
//! | type                | data                         |
//! |---------------------|------------------------------|
//! | `connection_init`   | none                         |
//! | `user_added`        | user                         |
//! | `user_changed`      | user                         |
//! | `user_removed`      | username                     |
//! | `structure_changed` | chart structure, no users    |
//! | `keep_connection`   | none                         |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::chart::ChartStructure;
use crate::domain::foundation::ChartId;
use crate::domain::preference::User;

use super::SessionError;

/// Discriminator carried in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    ConnectionInit,
    UserAdded,
    UserChanged,
    UserRemoved,
    StructureChanged,
    KeepConnection,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageType::ConnectionInit => "connection_init",
            MessageType::UserAdded => "user_added",
            MessageType::UserChanged => "user_changed",
            MessageType::UserRemoved => "user_removed",
            MessageType::StructureChanged => "structure_changed",
            MessageType::KeepConnection => "keep_connection",
        };
        f.write_str(s)
    }
}

/// Untyped envelope as sent over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default)]
    pub data: serde_json::Value,
    pub chart_id: ChartId,
}

impl WireMessage {
    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string(self).map_err(|e| SessionError::malformed(e.to_string()))
    }

    pub fn from_json(text: &str) -> Result<Self, SessionError> {
        serde_json::from_str(text).map_err(|e| SessionError::malformed(e.to_string()))
    }
}

/// Typed view of a [`WireMessage`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMessage {
    ConnectionInit,
    UserAdded(User),
    UserChanged(User),
    UserRemoved(String),
    StructureChanged(ChartStructure),
    KeepConnection,
}

impl SessionMessage {
    pub fn kind(&self) -> MessageType {
        match self {
            SessionMessage::ConnectionInit => MessageType::ConnectionInit,
            SessionMessage::UserAdded(_) => MessageType::UserAdded,
            SessionMessage::UserChanged(_) => MessageType::UserChanged,
            SessionMessage::UserRemoved(_) => MessageType::UserRemoved,
            SessionMessage::StructureChanged(_) => MessageType::StructureChanged,
            SessionMessage::KeepConnection => MessageType::KeepConnection,
        }
    }

    /// Wraps the message in an envelope for `chart_id`.
    pub fn into_wire(self, chart_id: ChartId) -> Result<WireMessage, SessionError> {
        let kind = self.kind();
        let data = match self {
            SessionMessage::ConnectionInit | SessionMessage::KeepConnection => {
                Ok(serde_json::Value::Null)
            }
            SessionMessage::UserAdded(user) | SessionMessage::UserChanged(user) => {
                serde_json::to_value(user)
            }
            SessionMessage::UserRemoved(username) => Ok(serde_json::Value::String(username)),
            SessionMessage::StructureChanged(structure) => serde_json::to_value(structure),
        }
        .map_err(|e| SessionError::malformed(e.to_string()))?;
        Ok(WireMessage {
            kind,
            data,
            chart_id,
        })
    }
}

impl TryFrom<WireMessage> for SessionMessage {
    type Error = SessionError;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let malformed = |e: serde_json::Error| {
            SessionError::malformed(format!("invalid {} payload: {}", wire.kind, e))
        };
        Ok(match wire.kind {
            MessageType::ConnectionInit => SessionMessage::ConnectionInit,
            MessageType::KeepConnection => SessionMessage::KeepConnection,
            MessageType::UserAdded => SessionMessage::UserAdded(
                serde_json::from_value(wire.data.clone()).map_err(malformed)?,
            ),
            MessageType::UserChanged => SessionMessage::UserChanged(
                serde_json::from_value(wire.data.clone()).map_err(malformed)?,
            ),
            MessageType::UserRemoved => SessionMessage::UserRemoved(
                serde_json::from_value(wire.data.clone()).map_err(malformed)?,
            ),
            MessageType::StructureChanged => SessionMessage::StructureChanged(
                serde_json::from_value(wire.data.clone()).map_err(malformed)?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::objective::{Domain, Objective};

    fn root() -> Objective {
        Objective::group(
            "root",
            "Root",
            vec![Objective::primitive("rate", "Rate", Domain::continuous(0.0, 1.0))],
        )
    }

    #[test]
    fn envelope_uses_type_data_chart_id() {
        let chart_id = ChartId::new();
        let wire = SessionMessage::UserRemoved("bob".to_string())
            .into_wire(chart_id)
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&wire.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "user_removed");
        assert_eq!(json["data"], "bob");
        assert_eq!(json["chartId"], chart_id.to_string());
    }

    #[test]
    fn heartbeat_without_data_parses() {
        let chart_id = ChartId::new();
        let text = format!(r#"{{"type":"keep_connection","chartId":"{}"}}"#, chart_id);
        let wire = WireMessage::from_json(&text).unwrap();
        assert_eq!(
            SessionMessage::try_from(wire).unwrap(),
            SessionMessage::KeepConnection
        );
    }

    #[test]
    fn user_payload_survives_the_wire() {
        let user = User::with_defaults("alice", &root()).unwrap();
        let wire = SessionMessage::UserChanged(user.clone())
            .into_wire(ChartId::new())
            .unwrap();
        let parsed = WireMessage::from_json(&wire.to_json().unwrap()).unwrap();
        assert_eq!(SessionMessage::try_from(parsed).unwrap(), SessionMessage::UserChanged(user));
    }

    #[test]
    fn bad_payload_is_malformed() {
        let wire = WireMessage {
            kind: MessageType::UserAdded,
            data: serde_json::json!({"nope": true}),
            chart_id: ChartId::new(),
        };
        assert!(matches!(
            SessionMessage::try_from(wire),
            Err(SessionError::MalformedMessage(_))
        ));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let text = format!(r#"{{"type":"teleport","chartId":"{}"}}"#, ChartId::new());
        assert!(WireMessage::from_json(&text).is_err());
    }
}
