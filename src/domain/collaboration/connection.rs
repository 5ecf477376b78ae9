//! Per-connection lifecycle.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Lifecycle of one participant connection.
///
/// `Connecting → Active → (Closing | Failed) → Closed`. Only
/// `connection_init` is processed while `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Connecting,
    Active,
    Closing,
    Failed,
    Closed,
}

impl ConnectionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionStatus::Active)
    }
}

impl StateMachine for ConnectionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConnectionStatus::*;
        matches!(
            (self, target),
            (Connecting, Active)
                | (Connecting, Failed)
                | (Connecting, Closing)
                | (Active, Closing)
                | (Active, Failed)
                | (Closing, Closed)
                | (Failed, Closed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionStatus::*;
        match self {
            Connecting => vec![Active, Closing, Failed],
            Active => vec![Closing, Failed],
            Closing | Failed => vec![Closed],
            Closed => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_closed() {
        let status = ConnectionStatus::default()
            .transition_to(ConnectionStatus::Active)
            .and_then(|s| s.transition_to(ConnectionStatus::Closing))
            .and_then(|s| s.transition_to(ConnectionStatus::Closed))
            .unwrap();
        assert!(status.is_terminal());
    }

    #[test]
    fn failed_connection_cannot_reactivate() {
        assert!(ConnectionStatus::Failed
            .transition_to(ConnectionStatus::Active)
            .is_err());
    }

    #[test]
    fn transitions_agree_with_valid_transitions() {
        use ConnectionStatus::*;
        for from in [Connecting, Active, Closing, Failed, Closed] {
            for to in [Connecting, Active, Closing, Failed, Closed] {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }
}
