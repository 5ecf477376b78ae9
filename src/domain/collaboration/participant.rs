//! Participant replica - a joined client's local copy of the chart.
//!
//! The replica changes only in response to host messages or local edits.
//! Local edits go through the undo history and produce the message to send
//! to the host.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::domain::chart::{Chart, ChartStructure, UserUpsert};
use crate::domain::foundation::{ObjectiveId, StateMachine};
use crate::domain::history::{ChangeStack, ChangeType, RecordTarget};
use crate::domain::objective::DomainValue;
use crate::domain::preference::User;
use crate::domain::redistribution::{
    pump, resize_neighbors, resize_siblings, sibling_weights, PumpDirection, RedistributionError,
};
use crate::domain::score_function::{ScoreFunctionError, Scoring};
use crate::ports::ChartValidator;

use super::apply::{apply_structure, validate_user, StructureUpdate};
use super::{ConnectionStatus, SessionError, SessionMessage, UserRole, WireMessage};

/// Why a message was accepted without changing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Echo of the local user's own submission.
    OwnEcho,
    /// Same state already applied.
    Duplicate,
    /// Removal of a user this replica does not hold.
    UnknownUser,
}

/// What handling one inbound message did.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Ready,
    Ignored(IgnoreReason),
    UserUpserted {
        username: String,
        outcome: UserUpsert,
        valid: bool,
    },
    UserRemoved {
        username: String,
        was_local: bool,
    },
    StructureApplied(StructureUpdate),
    HeartbeatAcknowledged,
}

/// Errors raised by local edits.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("Local user '{0}' has no preferences in this chart")]
    NoLocalUser(String),

    #[error("Unknown objective '{0}'")]
    UnknownObjective(ObjectiveId),

    #[error(transparent)]
    Redistribution(#[from] RedistributionError),

    #[error(transparent)]
    ScoreFunction(#[from] ScoreFunctionError),
}

/// A joined participant's replica of one chart.
pub struct ParticipantSession {
    chart: Chart,
    username: String,
    role: UserRole,
    status: ConnectionStatus,
    validator: Arc<dyn ChartValidator>,
    history: ChangeStack,
    /// Local user as last sent to the host.
    submitted: Option<User>,
}

impl ParticipantSession {
    pub fn new(chart: Chart, username: impl Into<String>, validator: Arc<dyn ChartValidator>) -> Self {
        let username = username.into();
        let submitted = chart.user(&username).cloned();
        let role = UserRole::for_user(&username, chart.creator(), submitted.is_some());
        Self {
            chart,
            username,
            role,
            status: ConnectionStatus::Connecting,
            validator,
            history: ChangeStack::new(),
            submitted,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn history(&self) -> &ChangeStack {
        &self.history
    }

    pub fn local_user(&self) -> Option<&User> {
        self.chart.user(&self.username)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound
    // ─────────────────────────────────────────────────────────────────────────

    /// Applies one message from the host.
    ///
    /// # Errors
    ///
    /// - `ChartMismatch` for messages addressed to another chart
    /// - `NotActive` for anything but `connection_init` before activation
    /// - `MalformedMessage` if the payload does not decode
    /// - `StructureRejected` if a new structure fails validation
    pub fn handle(&mut self, wire: WireMessage) -> Result<SessionEvent, SessionError> {
        if wire.chart_id != self.chart.id() {
            return Err(SessionError::ChartMismatch {
                expected: self.chart.id(),
                actual: wire.chart_id,
            });
        }
        let message = SessionMessage::try_from(wire)?;

        match message {
            SessionMessage::ConnectionInit => self.activate(),
            _ if !self.status.is_active() => Err(SessionError::NotActive(message.kind())),
            SessionMessage::UserAdded(user) | SessionMessage::UserChanged(user) => {
                Ok(self.receive_user(user))
            }
            SessionMessage::UserRemoved(username) => Ok(self.receive_removal(&username)),
            SessionMessage::StructureChanged(structure) => self.receive_structure(structure),
            SessionMessage::KeepConnection => Ok(SessionEvent::HeartbeatAcknowledged),
        }
    }

    fn activate(&mut self) -> Result<SessionEvent, SessionError> {
        if self.status.is_active() {
            return Ok(SessionEvent::Ignored(IgnoreReason::Duplicate));
        }
        self.status = self
            .status
            .transition_to(ConnectionStatus::Active)
            .map_err(|e| SessionError::invalid_state(e.to_string()))?;
        info!(chart_id = %self.chart.id(), username = %self.username, "Session ready");
        Ok(SessionEvent::Ready)
    }

    fn receive_user(&mut self, user: User) -> SessionEvent {
        if user.username() == self.username {
            return SessionEvent::Ignored(IgnoreReason::OwnEcho);
        }
        let user = validate_user(&self.chart, user, self.validator.as_ref());
        let username = user.username().to_string();
        let valid = user.is_valid();
        match self.chart.upsert_user(user) {
            UserUpsert::Unchanged => SessionEvent::Ignored(IgnoreReason::Duplicate),
            outcome => {
                debug!(username = %username, ?outcome, valid, "Replica user updated");
                SessionEvent::UserUpserted {
                    username,
                    outcome,
                    valid,
                }
            }
        }
    }

    fn receive_removal(&mut self, username: &str) -> SessionEvent {
        if self.chart.remove_user(username).is_none() {
            return SessionEvent::Ignored(IgnoreReason::UnknownUser);
        }
        let was_local = username == self.username;
        if was_local {
            self.role = self.role.downgrade();
            self.submitted = None;
            self.history.clear();
            info!(username = %username, role = ?self.role, "Local user removed from chart");
        }
        SessionEvent::UserRemoved {
            username: username.to_string(),
            was_local,
        }
    }

    fn receive_structure(&mut self, structure: ChartStructure) -> Result<SessionEvent, SessionError> {
        match apply_structure(&mut self.chart, structure, self.validator.as_ref())? {
            None => Ok(SessionEvent::Ignored(IgnoreReason::Duplicate)),
            Some(update) => {
                // records may point at objectives that no longer exist
                self.history.clear();
                Ok(SessionEvent::StructureApplied(update))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Outbound
    // ─────────────────────────────────────────────────────────────────────────

    /// Heartbeat to send while the connection is idle.
    pub fn heartbeat(&self) -> Result<WireMessage, SessionError> {
        SessionMessage::KeepConnection.into_wire(self.chart.id())
    }

    /// Stores the local user's preferences and returns the message announcing them.
    ///
    /// # Errors
    ///
    /// - `Forbidden` if `user` is not the local user
    /// - `UserRejected` if the preferences fail validation
    pub fn submit_preferences(&mut self, user: User) -> Result<WireMessage, SessionError> {
        if user.username() != self.username {
            return Err(SessionError::forbidden(format!(
                "'{}' cannot submit preferences for '{}'",
                self.username,
                user.username()
            )));
        }
        let user = validate_user(&self.chart, user, self.validator.as_ref());
        if !user.is_valid() {
            return Err(SessionError::UserRejected {
                username: self.username.clone(),
                reasons: user.invalid_reasons().to_vec(),
            });
        }
        self.chart.upsert_user(user);
        self.role = self.role.upgrade();
        self.announce_local_user()?
            .ok_or_else(|| SessionError::invalid_state("local user missing after submit"))
    }

    /// Announces the local user if it differs from what the host last saw.
    fn announce_local_user(&mut self) -> Result<Option<WireMessage>, SessionError> {
        let Some(user) = self.chart.user(&self.username) else {
            return Ok(None);
        };
        if self
            .submitted
            .as_ref()
            .is_some_and(|previous| previous.same_preferences(user))
        {
            return Ok(None);
        }
        let message = match self.submitted {
            Some(_) => SessionMessage::UserChanged(user.clone()),
            None => SessionMessage::UserAdded(user.clone()),
        };
        self.submitted = Some(user.clone());
        message.into_wire(self.chart.id()).map(Some)
    }

    /// Removes the local user's preferences and returns the message to send.
    pub fn leave(&mut self) -> Result<Option<WireMessage>, SessionError> {
        if self.chart.remove_user(&self.username).is_none() {
            return Ok(None);
        }
        self.role = self.role.downgrade();
        self.submitted = None;
        self.history.clear();
        SessionMessage::UserRemoved(self.username.clone())
            .into_wire(self.chart.id())
            .map(Some)
    }

    /// Applies an owner's structural edit locally and returns the message to send.
    ///
    /// Returns `Ok(None)` if the structure is unchanged.
    pub fn propose_structure(
        &mut self,
        structure: ChartStructure,
    ) -> Result<Option<(StructureUpdate, WireMessage)>, SessionError> {
        if !self.role.is_owner() {
            return Err(SessionError::forbidden(format!(
                "'{}' does not own chart {}",
                self.username,
                self.chart.id()
            )));
        }
        let Some(update) = apply_structure(&mut self.chart, structure.clone(), self.validator.as_ref())?
        else {
            return Ok(None);
        };
        self.history.clear();
        let wire = SessionMessage::StructureChanged(structure).into_wire(self.chart.id())?;
        Ok(Some((update, wire)))
    }

    /// Marks the connection closed and discards local history.
    pub fn close(&mut self, failed: bool) {
        let next = if failed {
            ConnectionStatus::Failed
        } else {
            ConnectionStatus::Closing
        };
        if let Ok(status) = self.status.transition_to(next) {
            self.status = status;
        }
        if let Ok(status) = self.status.transition_to(ConnectionStatus::Closed) {
            self.status = status;
        }
        self.history.clear();
        debug!(chart_id = %self.chart.id(), username = %self.username, "Participant session closed");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local edits
    // ─────────────────────────────────────────────────────────────────────────

    /// Starts a user gesture; edits until [`finish_edit`](Self::finish_edit)
    /// undo in one step.
    pub fn begin_edit(&mut self) {
        self.history.begin_action();
    }

    /// Ends a gesture and returns the update for the host, if any.
    pub fn finish_edit(&mut self) -> Result<Option<WireMessage>, SessionError> {
        self.history.finish_action(&self.chart);
        self.announce_local_user()
    }

    fn ensure_local_user(&self) -> Result<(), EditError> {
        match self.local_user() {
            Some(_) => Ok(()),
            None => Err(EditError::NoLocalUser(self.username.clone())),
        }
    }

    fn local_user_mut<'a>(chart: &'a mut Chart, username: &str) -> Result<&'a mut User, EditError> {
        chart
            .user_mut(username)
            .ok_or_else(|| EditError::NoLocalUser(username.to_string()))
    }

    /// Runs `edit` with `target` snapshotted first.
    ///
    /// Outside a gesture the edit is its own action. An edit that fails or
    /// changes nothing leaves neither an undo step nor a cleared redo stack.
    fn record_edit<T>(
        &mut self,
        target: RecordTarget,
        edit: impl FnOnce(&mut Chart) -> Result<T, EditError>,
    ) -> Result<T, EditError> {
        let standalone = !self.history.in_action();
        if standalone {
            self.history.begin_action();
        }
        self.history.save(&self.chart, target);
        let result = edit(&mut self.chart);
        if standalone {
            self.history.finish_action(&self.chart);
        } else if result.is_err() {
            self.history.remove_unnecessary_records(&self.chart);
        }
        result
    }

    fn weight_map_target(&self) -> RecordTarget {
        RecordTarget::WeightMap {
            username: self.username.clone(),
        }
    }

    fn score_function_target(&self, objective_id: &ObjectiveId) -> RecordTarget {
        RecordTarget::ScoreFunction {
            username: self.username.clone(),
            objective_id: objective_id.clone(),
        }
    }

    /// Nudges one primitive weight by one pump step.
    pub fn pump_weight(
        &mut self,
        objective_id: &ObjectiveId,
        direction: PumpDirection,
    ) -> Result<f64, EditError> {
        self.ensure_local_user()?;
        let username = self.username.clone();
        self.record_edit(self.weight_map_target(), |chart| {
            let root = chart.root_objective().clone();
            let user = Self::local_user_mut(chart, &username)?;
            Ok(pump(user.weight_map_mut(), &root, objective_id, direction)?)
        })
    }

    /// Shifts `delta` weight onto `objective_id` from its neighbouring sibling.
    pub fn resize_weight(&mut self, objective_id: &ObjectiveId, delta: f64) -> Result<f64, EditError> {
        self.ensure_local_user()?;
        let username = self.username.clone();
        self.record_edit(self.weight_map_target(), |chart| {
            let root = chart.root_objective().clone();
            let user = Self::local_user_mut(chart, &username)?;
            let siblings = sibling_weights(&root, user.weight_map(), objective_id)?;
            let index = siblings
                .iter()
                .position(|s| &s.objective_id == objective_id)
                .ok_or_else(|| EditError::UnknownObjective(objective_id.clone()))?;
            Ok(resize_neighbors(user.weight_map_mut(), &root, &siblings, index, delta)?)
        })
    }

    /// Splits two siblings' combined weight so `first` holds `proportion` of it.
    pub fn split_weight(
        &mut self,
        first: &ObjectiveId,
        second: &ObjectiveId,
        proportion: f64,
    ) -> Result<f64, EditError> {
        self.ensure_local_user()?;
        let username = self.username.clone();
        self.record_edit(self.weight_map_target(), |chart| {
            let root = chart.root_objective().clone();
            let user = Self::local_user_mut(chart, &username)?;
            Ok(resize_siblings(user.weight_map_mut(), &root, first, second, proportion)?)
        })
    }

    /// Sets the local user's score for one domain value.
    pub fn set_score(
        &mut self,
        objective_id: &ObjectiveId,
        value: &DomainValue,
        score: f64,
    ) -> Result<(), EditError> {
        self.ensure_local_user()?;
        let username = self.username.clone();
        self.record_edit(self.score_function_target(objective_id), |chart| {
            let function = Self::local_user_mut(chart, &username)?
                .score_functions_mut()
                .get_mut(objective_id)
                .ok_or_else(|| EditError::UnknownObjective(objective_id.clone()))?;
            Ok(function.set_element_score(value, score)?)
        })
    }

    /// Rescales the local user's score function to span 0 to 1.
    ///
    /// Returns true if any score changed, so the caller can warn the user.
    pub fn rescale_score_function(&mut self, objective_id: &ObjectiveId) -> Result<bool, EditError> {
        self.ensure_local_user()?;
        let username = self.username.clone();
        self.record_edit(self.score_function_target(objective_id), |chart| {
            let function = Self::local_user_mut(chart, &username)?
                .score_functions_mut()
                .get_mut(objective_id)
                .ok_or_else(|| EditError::UnknownObjective(objective_id.clone()))?;
            Ok(function.rescale())
        })
    }

    /// Moves an alternative in the local display order.
    ///
    /// Returns false if either index is out of range.
    pub fn move_alternative(&mut self, from: usize, to: usize) -> bool {
        let moved = self.record_edit(RecordTarget::AlternativeOrder, |chart| {
            Ok(chart.move_alternative(from, to))
        });
        matches!(moved, Ok(true))
    }

    /// Reverts the last edit and returns the update for the host, if any.
    pub fn undo(&mut self) -> Result<Option<WireMessage>, SessionError> {
        match self.history.undo(&mut self.chart) {
            Some(changes) if touches_preferences(&changes) => self.announce_local_user(),
            _ => Ok(None),
        }
    }

    /// Re-applies the last undone edit and returns the update for the host, if any.
    pub fn redo(&mut self) -> Result<Option<WireMessage>, SessionError> {
        match self.history.redo(&mut self.chart) {
            Some(changes) if touches_preferences(&changes) => self.announce_local_user(),
            _ => Ok(None),
        }
    }
}

fn touches_preferences(changes: &[ChangeType]) -> bool {
    changes
        .iter()
        .any(|c| *c != ChangeType::AlternativeOrderChange)
}

impl std::fmt::Debug for ParticipantSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantSession")
            .field("chart_id", &self.chart.id())
            .field("username", &self.username)
            .field("role", &self.role)
            .field("status", &self.status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::validation::StandardChartValidator;
    use crate::domain::chart::Alternative;
    use crate::domain::foundation::{ChartId, WEIGHT_SUM_TOLERANCE};
    use crate::domain::objective::{Domain, Objective};
    use crate::domain::preference::{ScoreFunctionMap, WeightMap};

    fn structure() -> ChartStructure {
        let root = Objective::group(
            "hotel",
            "Hotel",
            vec![
                Objective::primitive("area", "Area", Domain::categorical(["nightlife", "airport"])),
                Objective::primitive("rate", "Rate", Domain::continuous(100.0, 200.0)),
                Objective::primitive("size", "Size", Domain::continuous(200.0, 350.0)),
            ],
        );
        let mut s = ChartStructure::new(ChartId::new(), "Hotels", "owner", root);
        s.alternatives = vec![
            Alternative::new("Sheraton")
                .with_value("area", "nightlife")
                .with_value("rate", 150.0)
                .with_value("size", 350.0),
            Alternative::new("Hyatt")
                .with_value("area", "airport")
                .with_value("rate", 120.0)
                .with_value("size", 200.0),
        ];
        s
    }

    fn user(name: &str, root: &Objective) -> User {
        User::new(
            name,
            WeightMap::from_weights([("area", 0.25), ("rate", 0.25), ("size", 0.5)]),
            ScoreFunctionMap::defaults_for(root),
        )
        .unwrap()
    }

    fn session(username: &str) -> ParticipantSession {
        let s = structure();
        let mut chart = Chart::new(s.clone());
        chart.upsert_user(user("alice", &s.root_objective));
        ParticipantSession::new(chart, username, Arc::new(StandardChartValidator::new()))
    }

    fn wire(session: &ParticipantSession, message: SessionMessage) -> WireMessage {
        message.into_wire(session.chart().id()).unwrap()
    }

    fn active(username: &str) -> ParticipantSession {
        let mut s = session(username);
        let init = wire(&s, SessionMessage::ConnectionInit);
        assert_eq!(s.handle(init).unwrap(), SessionEvent::Ready);
        s
    }

    #[test]
    fn only_connection_init_before_activation() {
        let mut s = session("bob");
        let bob = user("bob", s.chart().root_objective());
        let msg = wire(&s, SessionMessage::UserAdded(bob));
        assert_eq!(
            s.handle(msg),
            Err(SessionError::NotActive(crate::domain::collaboration::MessageType::UserAdded))
        );
    }

    #[test]
    fn own_echo_is_ignored() {
        let mut s = active("alice");
        let mut echo = s.local_user().unwrap().clone();
        echo.set_weight_map(WeightMap::from_weights([("area", 1.0)]));
        let msg = wire(&s, SessionMessage::UserChanged(echo));

        assert_eq!(s.handle(msg).unwrap(), SessionEvent::Ignored(IgnoreReason::OwnEcho));
        assert_eq!(s.local_user().unwrap().weight_map().len(), 3);
    }

    #[test]
    fn duplicate_user_message_is_idempotent() {
        let mut s = active("alice");
        let bob = user("bob", s.chart().root_objective());
        let msg = wire(&s, SessionMessage::UserAdded(bob));

        assert!(matches!(
            s.handle(msg.clone()).unwrap(),
            SessionEvent::UserUpserted { outcome: UserUpsert::Added, valid: true, .. }
        ));
        let after_first = s.chart().clone();
        assert_eq!(s.handle(msg).unwrap(), SessionEvent::Ignored(IgnoreReason::Duplicate));
        assert_eq!(s.chart(), &after_first);
    }

    #[test]
    fn removing_local_user_downgrades_role() {
        let mut s = active("alice");
        assert_eq!(s.role(), UserRole::Participant);
        let msg = wire(&s, SessionMessage::UserRemoved("alice".to_string()));

        assert_eq!(
            s.handle(msg).unwrap(),
            SessionEvent::UserRemoved {
                username: "alice".to_string(),
                was_local: true
            }
        );
        assert_eq!(s.role(), UserRole::Viewer);
        assert!(s.local_user().is_none());
    }

    #[test]
    fn structure_change_repairs_users_and_is_idempotent() {
        let mut s = active("bob");
        let mut next = s.chart().structure().clone();
        next.root_objective.remove_descendant(&"size".into());
        for alternative in &mut next.alternatives {
            alternative.values.remove(&ObjectiveId::from("size"));
        }
        let msg = wire(&s, SessionMessage::StructureChanged(next));

        let event = s.handle(msg.clone()).unwrap();
        let SessionEvent::StructureApplied(update) = event else {
            panic!("expected structure to apply");
        };
        assert!(update.invalid_users.is_empty());
        let alice = s.chart().user("alice").unwrap();
        assert!(!alice.weight_map().contains(&"size".into()));
        assert!((alice.weight_map().weight_total() - 1.0).abs() < WEIGHT_SUM_TOLERANCE);

        let once = s.chart().clone();
        assert_eq!(s.handle(msg).unwrap(), SessionEvent::Ignored(IgnoreReason::Duplicate));
        assert_eq!(s.chart(), &once);
    }

    #[test]
    fn invalid_structure_is_rejected_and_not_applied() {
        let mut s = active("bob");
        let before = s.chart().clone();
        let mut next = before.structure().clone();
        next.alternatives[0].values.clear();
        let msg = wire(&s, SessionMessage::StructureChanged(next));

        assert!(matches!(s.handle(msg), Err(SessionError::StructureRejected(_))));
        assert_eq!(s.chart(), &before);
    }

    #[test]
    fn message_for_other_chart_is_rejected() {
        let mut s = active("bob");
        let msg = SessionMessage::KeepConnection.into_wire(ChartId::new()).unwrap();
        assert!(matches!(s.handle(msg), Err(SessionError::ChartMismatch { .. })));
    }

    #[test]
    fn gesture_produces_one_update_and_undoes_in_one_step() {
        let mut s = active("alice");
        let before = s.local_user().unwrap().clone();

        s.begin_edit();
        for _ in 0..3 {
            s.pump_weight(&"area".into(), PumpDirection::Increase).unwrap();
        }
        let update = s.finish_edit().unwrap().unwrap();
        assert_eq!(update.kind, crate::domain::collaboration::MessageType::UserChanged);
        assert_eq!(s.history().undo_len(), 1);

        let undo = s.undo().unwrap().unwrap();
        assert_eq!(undo.kind, crate::domain::collaboration::MessageType::UserChanged);
        assert!(s.local_user().unwrap().same_preferences(&before));
    }

    #[test]
    fn failed_edit_leaves_history_alone() {
        let root = Objective::group(
            "hotel",
            "Hotel",
            vec![
                Objective::group(
                    "g",
                    "Location",
                    vec![
                        Objective::primitive("area", "Area", Domain::categorical(["nightlife", "airport"])),
                        Objective::primitive("skytrain", "Skytrain", Domain::continuous(1.0, 9.0)),
                    ],
                ),
                Objective::primitive("rate", "Rate", Domain::continuous(100.0, 200.0)),
            ],
        );
        let mut chart = Chart::new(ChartStructure::new(ChartId::new(), "Hotels", "owner", root.clone()));
        chart.upsert_user(
            User::new(
                "alice",
                WeightMap::from_weights([("area", 0.25), ("skytrain", 0.25), ("rate", 0.5)]),
                ScoreFunctionMap::defaults_for(&root),
            )
            .unwrap(),
        );
        let mut s = ParticipantSession::new(chart, "alice", Arc::new(StandardChartValidator::new()));
        s.pump_weight(&"rate".into(), PumpDirection::Increase).unwrap();
        s.undo().unwrap();
        assert_eq!(s.history().redo_len(), 1);

        assert!(s.pump_weight(&"g".into(), PumpDirection::Increase).is_err());
        assert!(s.set_score(&"rate".into(), &150.0.into(), f64::NAN).is_err());
        assert!(!s.move_alternative(3, 0));

        assert_eq!(s.history().undo_len(), 0);
        assert_eq!(s.history().redo_len(), 1);
    }

    #[test]
    fn failed_step_inside_gesture_keeps_earlier_snapshot() {
        let mut s = active("alice");
        let before = s.local_user().unwrap().clone();

        s.begin_edit();
        s.pump_weight(&"area".into(), PumpDirection::Increase).unwrap();
        assert!(s.resize_weight(&"area".into(), f64::NAN).is_err());
        s.pump_weight(&"area".into(), PumpDirection::Increase).unwrap();
        s.finish_edit().unwrap();

        assert_eq!(s.history().undo_len(), 1);
        s.undo().unwrap();
        assert!(s.local_user().unwrap().same_preferences(&before));
    }

    #[test]
    fn gesture_over_weights_and_scores_undoes_in_one_step() {
        let mut s = active("alice");
        let before = s.local_user().unwrap().clone();

        s.begin_edit();
        s.pump_weight(&"rate".into(), PumpDirection::Increase).unwrap();
        s.set_score(&"area".into(), &"airport".into(), 0.3).unwrap();
        s.finish_edit().unwrap();

        assert_eq!(s.history().undo_len(), 1);
        s.undo().unwrap();
        assert!(s.local_user().unwrap().same_preferences(&before));
    }

    #[test]
    fn viewer_submits_preferences_and_becomes_participant() {
        let mut s = active("bob");
        assert_eq!(s.role(), UserRole::Viewer);
        let bob = user("bob", s.chart().root_objective());

        let msg = s.submit_preferences(bob).unwrap();

        assert_eq!(msg.kind, crate::domain::collaboration::MessageType::UserAdded);
        assert_eq!(s.role(), UserRole::Participant);
    }

    #[test]
    fn invalid_submission_is_rejected() {
        let mut s = active("bob");
        let bob = User::new(
            "bob",
            WeightMap::from_weights([("area", 0.5)]),
            ScoreFunctionMap::new(),
        )
        .unwrap();
        assert!(matches!(
            s.submit_preferences(bob),
            Err(SessionError::UserRejected { .. })
        ));
    }

    #[test]
    fn only_owner_proposes_structure() {
        let mut bob = active("bob");
        let next = bob.chart().structure().clone();
        assert!(matches!(bob.propose_structure(next), Err(SessionError::Forbidden(_))));

        let mut owner = active("owner");
        let mut renamed = owner.chart().structure().clone();
        renamed.name = "Vancouver Hotels".to_string();
        let (update, msg) = owner.propose_structure(renamed).unwrap().unwrap();
        assert_eq!(update.messages().len(), 1);
        assert_eq!(msg.kind, crate::domain::collaboration::MessageType::StructureChanged);
    }
}
