//! Local participant roles.

use serde::{Deserialize, Serialize};

/// What the local participant may do in a chart session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Owns the structure and has submitted preferences.
    OwnerAndParticipant,
    /// Owns the structure only.
    Owner,
    /// Has submitted preferences.
    Participant,
    /// Watches without preferences.
    Viewer,
}

impl UserRole {
    /// Role for `username` in a chart created by `creator`.
    pub fn for_user(username: &str, creator: &str, has_preferences: bool) -> Self {
        match (username == creator, has_preferences) {
            (true, true) => UserRole::OwnerAndParticipant,
            (true, false) => UserRole::Owner,
            (false, true) => UserRole::Participant,
            (false, false) => UserRole::Viewer,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, UserRole::OwnerAndParticipant | UserRole::Owner)
    }

    pub fn is_participant(&self) -> bool {
        matches!(self, UserRole::OwnerAndParticipant | UserRole::Participant)
    }

    /// Role after the local user's preferences were removed.
    pub fn downgrade(self) -> Self {
        match self {
            UserRole::OwnerAndParticipant => UserRole::Owner,
            UserRole::Participant => UserRole::Viewer,
            other => other,
        }
    }

    /// Role after the local user submitted preferences.
    pub fn upgrade(self) -> Self {
        match self {
            UserRole::Owner => UserRole::OwnerAndParticipant,
            UserRole::Viewer => UserRole::Participant,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downgrade_drops_participation_only() {
        assert_eq!(UserRole::OwnerAndParticipant.downgrade(), UserRole::Owner);
        assert_eq!(UserRole::Participant.downgrade(), UserRole::Viewer);
        assert_eq!(UserRole::Owner.downgrade(), UserRole::Owner);
        assert_eq!(UserRole::Viewer.downgrade(), UserRole::Viewer);
    }

    #[test]
    fn role_from_chart_membership() {
        assert_eq!(UserRole::for_user("ann", "ann", false), UserRole::Owner);
        assert_eq!(UserRole::for_user("bob", "ann", true), UserRole::Participant);
        assert!(UserRole::Owner.upgrade().is_participant());
    }
}
