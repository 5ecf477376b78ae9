//! Host session - the authoritative chart of one live session.
//!
//! The host is a pure state machine: every call returns a [`HostOutcome`]
//! listing the messages to deliver, the state to persist and the connections
//! to close. Driving I/O is left to the caller, which owns the only copy of
//! the session and therefore serialises all mutations.

use chrono::Duration;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::chart::{Chart, ChartStructure, UserUpsert};
use crate::domain::foundation::{ConnectionId, StateMachine, Timestamp};
use crate::domain::preference::User;
use crate::ports::{ChartValidator, CloseReason};

use super::apply::{apply_structure, validate_user, StructureUpdate};
use super::{ConnectionStatus, SessionError, SessionMessage, WireMessage};

/// Who receives a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Connection(ConnectionId),
    AllExcept(ConnectionId),
    All,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub recipient: Recipient,
    pub message: WireMessage,
}

/// State the caller must write through the repository.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistRequest {
    User(User),
    Chart(Chart),
}

/// Side effects of one host operation, in the order they should happen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HostOutcome {
    pub deliveries: Vec<Delivery>,
    pub persist: Vec<PersistRequest>,
    pub close: Vec<(ConnectionId, CloseReason)>,
    pub structure_update: Option<StructureUpdate>,
    /// The owner left; every connection is in `close` and the session is over.
    pub session_ended: bool,
}

impl HostOutcome {
    fn deliver(&mut self, recipient: Recipient, message: WireMessage) {
        self.deliveries.push(Delivery { recipient, message });
    }

    fn merge(&mut self, other: HostOutcome) {
        self.deliveries.extend(other.deliveries);
        self.persist.extend(other.persist);
        self.close.extend(other.close);
        if other.structure_update.is_some() {
            self.structure_update = other.structure_update;
        }
        self.session_ended |= other.session_ended;
    }
}

#[derive(Debug, Clone)]
struct HostConnection {
    username: String,
    status: ConnectionStatus,
    last_seen: Timestamp,
}

/// The host's view of one chart session.
pub struct HostSession {
    chart: Chart,
    validator: Arc<dyn ChartValidator>,
    connections: BTreeMap<ConnectionId, HostConnection>,
    ended: bool,
}

impl HostSession {
    /// Hosts `chart`, validating its stored users first.
    pub fn new(mut chart: Chart, validator: Arc<dyn ChartValidator>) -> Self {
        super::apply::revalidate_users(&mut chart, validator.as_ref());
        Self {
            chart,
            validator,
            connections: BTreeMap::new(),
            ended: false,
        }
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn connection_status(&self, connection_id: ConnectionId) -> Option<ConnectionStatus> {
        self.connections.get(&connection_id).map(|c| c.status)
    }

    /// Active connection ids, the recipients of broadcast deliveries.
    pub fn active_connections(&self) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|(_, c)| c.status.is_active())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Resolves a recipient to concrete active connections.
    pub fn recipients(&self, recipient: Recipient) -> Vec<ConnectionId> {
        match recipient {
            Recipient::Connection(id) => self
                .connections
                .get(&id)
                .filter(|c| c.status.is_active())
                .map(|_| vec![id])
                .unwrap_or_default(),
            Recipient::AllExcept(excluded) => self
                .active_connections()
                .into_iter()
                .filter(|id| *id != excluded)
                .collect(),
            Recipient::All => self.active_connections(),
        }
    }

    fn is_owner(&self, username: &str) -> bool {
        username == self.chart.creator()
    }

    fn wire(&self, message: SessionMessage) -> Result<WireMessage, SessionError> {
        message.into_wire(self.chart.id())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connection lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers a new connection for `username` and initialises it.
    pub fn open(
        &mut self,
        connection_id: ConnectionId,
        username: impl Into<String>,
        now: Timestamp,
    ) -> Result<HostOutcome, SessionError> {
        if self.ended {
            return Err(SessionError::invalid_state("session has ended"));
        }
        let username = username.into();
        let status = ConnectionStatus::Connecting
            .transition_to(ConnectionStatus::Active)
            .map_err(|e| SessionError::invalid_state(e.to_string()))?;
        info!(
            chart_id = %self.chart.id(),
            connection_id = %connection_id,
            username = %username,
            "Participant connected"
        );
        self.connections.insert(
            connection_id,
            HostConnection {
                username,
                status,
                last_seen: now,
            },
        );

        let mut outcome = HostOutcome::default();
        outcome.deliver(
            Recipient::Connection(connection_id),
            self.wire(SessionMessage::ConnectionInit)?,
        );
        Ok(outcome)
    }

    /// Drops a connection whose transport went away or who left.
    ///
    /// A participant's departure removes their user from the live chart and
    /// tells everyone else. The owner's departure ends the session.
    pub fn close(
        &mut self,
        connection_id: ConnectionId,
        failed: bool,
    ) -> Result<HostOutcome, SessionError> {
        let connection = self
            .connections
            .remove(&connection_id)
            .ok_or(SessionError::UnknownConnection(connection_id))?;
        let next = if failed {
            ConnectionStatus::Failed
        } else {
            ConnectionStatus::Closing
        };
        let status = connection
            .status
            .transition_to(next)
            .and_then(|s| s.transition_to(ConnectionStatus::Closed))
            .unwrap_or(ConnectionStatus::Closed);
        debug!(connection_id = %connection_id, ?status, "Connection closed");

        let mut outcome = HostOutcome::default();
        if self.is_owner(&connection.username) {
            self.end(&mut outcome);
            return Ok(outcome);
        }

        let still_connected = self
            .connections
            .values()
            .any(|c| c.username == connection.username);
        if !still_connected && self.chart.remove_user(&connection.username).is_some() {
            info!(
                chart_id = %self.chart.id(),
                username = %connection.username,
                "Participant left, removed from live chart"
            );
            outcome.deliver(
                Recipient::All,
                self.wire(SessionMessage::UserRemoved(connection.username))?,
            );
        }
        Ok(outcome)
    }

    /// Ends the session and closes every remaining connection normally.
    pub fn stop(&mut self) -> HostOutcome {
        let mut outcome = HostOutcome::default();
        self.end(&mut outcome);
        outcome
    }

    fn end(&mut self, outcome: &mut HostOutcome) {
        self.ended = true;
        outcome.session_ended = true;
        for id in std::mem::take(&mut self.connections).into_keys() {
            outcome.close.push((id, CloseReason::Normal));
        }
        info!(chart_id = %self.chart.id(), "Session ended");
    }

    /// Closes connections silent for longer than `idle_timeout`.
    pub fn sweep_idle(&mut self, now: Timestamp, idle_timeout: Duration) -> HostOutcome {
        let idle: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|(_, c)| now.duration_since(&c.last_seen) > idle_timeout)
            .map(|(id, _)| *id)
            .collect();

        let mut outcome = HostOutcome::default();
        for id in idle {
            if self.ended {
                break;
            }
            warn!(chart_id = %self.chart.id(), connection_id = %id, "Connection idle, closing");
            match self.close(id, true) {
                Ok(closed) => {
                    outcome.close.push((id, CloseReason::IdleTimeout));
                    outcome.merge(closed);
                }
                Err(e) => debug!(connection_id = %id, error = %e, "Idle connection already gone"),
            }
        }
        outcome
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound messages
    // ─────────────────────────────────────────────────────────────────────────

    /// Processes one message from a participant.
    ///
    /// # Errors
    ///
    /// - `UnknownConnection` if the connection was never opened or is gone
    /// - `ChartMismatch` for messages addressed to another chart
    /// - `Forbidden` for edits the sender does not own
    /// - `UserRejected` / `StructureRejected` when validation fails
    pub fn receive(
        &mut self,
        connection_id: ConnectionId,
        wire: WireMessage,
        now: Timestamp,
    ) -> Result<HostOutcome, SessionError> {
        let connection = self
            .connections
            .get_mut(&connection_id)
            .ok_or(SessionError::UnknownConnection(connection_id))?;
        connection.last_seen = now;
        if !connection.status.is_active() {
            return Err(SessionError::NotActive(wire.kind));
        }
        let sender = connection.username.clone();

        if wire.chart_id != self.chart.id() {
            return Err(SessionError::ChartMismatch {
                expected: self.chart.id(),
                actual: wire.chart_id,
            });
        }

        match SessionMessage::try_from(wire)? {
            SessionMessage::KeepConnection => {
                let mut outcome = HostOutcome::default();
                outcome.deliver(
                    Recipient::Connection(connection_id),
                    self.wire(SessionMessage::KeepConnection)?,
                );
                Ok(outcome)
            }
            SessionMessage::UserAdded(user) | SessionMessage::UserChanged(user) => {
                self.receive_user(connection_id, &sender, user)
            }
            SessionMessage::UserRemoved(username) => {
                self.receive_removal(connection_id, &sender, &username)
            }
            SessionMessage::StructureChanged(structure) => {
                self.receive_structure(connection_id, &sender, structure)
            }
            SessionMessage::ConnectionInit => {
                Err(SessionError::Unexpected(super::MessageType::ConnectionInit))
            }
        }
    }

    fn receive_user(
        &mut self,
        connection_id: ConnectionId,
        sender: &str,
        user: User,
    ) -> Result<HostOutcome, SessionError> {
        if user.username() != sender {
            return Err(SessionError::forbidden(format!(
                "'{}' cannot submit preferences for '{}'",
                sender,
                user.username()
            )));
        }
        let user = validate_user(&self.chart, user, self.validator.as_ref());
        if !user.is_valid() {
            warn!(
                chart_id = %self.chart.id(),
                username = %sender,
                reasons = ?user.invalid_reasons(),
                "Rejected user preferences"
            );
            return Err(SessionError::UserRejected {
                username: sender.to_string(),
                reasons: user.invalid_reasons().to_vec(),
            });
        }

        let mut outcome = HostOutcome::default();
        let message = match self.chart.upsert_user(user.clone()) {
            UserUpsert::Unchanged => return Ok(outcome),
            UserUpsert::Added => SessionMessage::UserAdded(user.clone()),
            UserUpsert::Changed => SessionMessage::UserChanged(user.clone()),
        };
        debug!(chart_id = %self.chart.id(), username = %sender, "User preferences accepted");
        outcome.deliver(Recipient::AllExcept(connection_id), self.wire(message)?);
        outcome.persist.push(PersistRequest::User(user));
        Ok(outcome)
    }

    fn receive_removal(
        &mut self,
        connection_id: ConnectionId,
        sender: &str,
        username: &str,
    ) -> Result<HostOutcome, SessionError> {
        if username != sender && !self.is_owner(sender) {
            return Err(SessionError::forbidden(format!(
                "'{}' cannot remove '{}'",
                sender, username
            )));
        }
        let mut outcome = HostOutcome::default();
        if self.chart.remove_user(username).is_none() {
            return Ok(outcome);
        }
        info!(chart_id = %self.chart.id(), username = %username, removed_by = %sender, "User removed");
        outcome.deliver(
            Recipient::AllExcept(connection_id),
            self.wire(SessionMessage::UserRemoved(username.to_string()))?,
        );
        outcome.persist.push(PersistRequest::Chart(self.chart.clone()));
        Ok(outcome)
    }

    fn receive_structure(
        &mut self,
        connection_id: ConnectionId,
        sender: &str,
        structure: ChartStructure,
    ) -> Result<HostOutcome, SessionError> {
        if !self.is_owner(sender) {
            return Err(SessionError::forbidden(format!(
                "'{}' does not own chart {}",
                sender,
                self.chart.id()
            )));
        }
        let mut outcome = HostOutcome::default();
        let Some(update) =
            apply_structure(&mut self.chart, structure.clone(), self.validator.as_ref())?
        else {
            return Ok(outcome);
        };
        info!(
            chart_id = %self.chart.id(),
            changes = ?update.messages(),
            "Chart structure changed"
        );
        outcome.deliver(
            Recipient::AllExcept(connection_id),
            self.wire(SessionMessage::StructureChanged(structure))?,
        );
        outcome.persist.push(PersistRequest::Chart(self.chart.clone()));
        outcome.structure_update = Some(update);
        Ok(outcome)
    }
}

impl std::fmt::Debug for HostSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSession")
            .field("chart_id", &self.chart.id())
            .field("connections", &self.connections.len())
            .field("ended", &self.ended)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::validation::StandardChartValidator;
    use crate::domain::chart::Alternative;
    use crate::domain::collaboration::MessageType;
    use crate::domain::foundation::ChartId;
    use crate::domain::objective::{Domain, Objective};

    fn chart() -> Chart {
        let root = Objective::group(
            "hotel",
            "Hotel",
            vec![
                Objective::primitive("area", "Area", Domain::categorical(["nightlife", "airport"])),
                Objective::primitive("rate", "Rate", Domain::continuous(100.0, 200.0)),
            ],
        );
        let mut structure = ChartStructure::new(ChartId::new(), "Hotels", "owner", root);
        structure.alternatives = vec![Alternative::new("Sheraton")
            .with_value("area", "nightlife")
            .with_value("rate", 150.0)];
        Chart::new(structure)
    }

    fn host() -> HostSession {
        HostSession::new(chart(), Arc::new(StandardChartValidator::new()))
    }

    fn connect(host: &mut HostSession, username: &str) -> ConnectionId {
        let id = ConnectionId::new();
        let outcome = host.open(id, username, Timestamp::now()).unwrap();
        assert_eq!(outcome.deliveries[0].message.kind, MessageType::ConnectionInit);
        id
    }

    fn submit(host: &mut HostSession, id: ConnectionId, username: &str) -> HostOutcome {
        let user = User::with_defaults(username, host.chart().root_objective()).unwrap();
        let wire = SessionMessage::UserAdded(user)
            .into_wire(host.chart().id())
            .unwrap();
        host.receive(id, wire, Timestamp::now()).unwrap()
    }

    #[test]
    fn open_sends_connection_init_to_new_connection() {
        let mut host = host();
        let id = ConnectionId::new();
        let outcome = host.open(id, "bob", Timestamp::now()).unwrap();
        assert_eq!(outcome.deliveries[0].recipient, Recipient::Connection(id));
        assert_eq!(host.connection_status(id), Some(ConnectionStatus::Active));
    }

    #[test]
    fn user_submission_is_relayed_and_persisted_once() {
        let mut host = host();
        let bob = connect(&mut host, "bob");
        connect(&mut host, "carol");

        let first = submit(&mut host, bob, "bob");
        assert_eq!(first.deliveries[0].recipient, Recipient::AllExcept(bob));
        assert_eq!(first.deliveries[0].message.kind, MessageType::UserAdded);
        assert!(matches!(first.persist[0], PersistRequest::User(_)));

        let duplicate = submit(&mut host, bob, "bob");
        assert!(duplicate.deliveries.is_empty());
        assert!(duplicate.persist.is_empty());
    }

    #[test]
    fn cannot_submit_for_someone_else() {
        let mut host = host();
        let bob = connect(&mut host, "bob");
        let carol = User::with_defaults("carol", host.chart().root_objective()).unwrap();
        let wire = SessionMessage::UserChanged(carol).into_wire(host.chart().id()).unwrap();
        assert!(matches!(
            host.receive(bob, wire, Timestamp::now()),
            Err(SessionError::Forbidden(_))
        ));
    }

    #[test]
    fn only_owner_changes_structure() {
        let mut host = host();
        let bob = connect(&mut host, "bob");
        let owner = connect(&mut host, "owner");
        let mut next = host.chart().structure().clone();
        next.name = "Renamed".to_string();
        let wire = SessionMessage::StructureChanged(next.clone())
            .into_wire(host.chart().id())
            .unwrap();

        assert!(matches!(
            host.receive(bob, wire.clone(), Timestamp::now()),
            Err(SessionError::Forbidden(_))
        ));
        let outcome = host.receive(owner, wire.clone(), Timestamp::now()).unwrap();
        assert_eq!(host.chart().name(), "Renamed");
        assert_eq!(outcome.deliveries[0].recipient, Recipient::AllExcept(owner));

        let again = host.receive(owner, wire, Timestamp::now()).unwrap();
        assert!(again.deliveries.is_empty());
    }

    #[test]
    fn heartbeat_is_echoed_to_sender() {
        let mut host = host();
        let bob = connect(&mut host, "bob");
        let wire = SessionMessage::KeepConnection.into_wire(host.chart().id()).unwrap();
        let outcome = host.receive(bob, wire, Timestamp::now()).unwrap();
        assert_eq!(outcome.deliveries.len(), 1);
        assert_eq!(outcome.deliveries[0].recipient, Recipient::Connection(bob));
    }

    #[test]
    fn participant_disconnect_removes_user() {
        let mut host = host();
        let bob = connect(&mut host, "bob");
        connect(&mut host, "carol");
        submit(&mut host, bob, "bob");

        let outcome = host.close(bob, true).unwrap();

        assert!(host.chart().user("bob").is_none());
        assert_eq!(outcome.deliveries[0].message.kind, MessageType::UserRemoved);
        assert!(outcome.persist.is_empty());
        assert!(!host.is_ended());
    }

    #[test]
    fn owner_leaving_ends_session() {
        let mut host = host();
        let owner = connect(&mut host, "owner");
        let bob = connect(&mut host, "bob");

        let outcome = host.close(owner, false).unwrap();

        assert!(outcome.session_ended);
        assert_eq!(outcome.close, vec![(bob, CloseReason::Normal)]);
        assert!(host.is_ended());
        assert!(host.open(ConnectionId::new(), "dave", Timestamp::now()).is_err());
    }

    #[test]
    fn idle_connections_are_swept() {
        let mut host = host();
        let start = Timestamp::now();
        let bob = ConnectionId::new();
        host.open(bob, "bob", start).unwrap();
        let carol = ConnectionId::new();
        host.open(carol, "carol", start).unwrap();
        let later = Timestamp::from_datetime(*start.as_datetime() + Duration::seconds(90));
        let wire = SessionMessage::KeepConnection.into_wire(host.chart().id()).unwrap();
        host.receive(carol, wire, later).unwrap();

        let outcome = host.sweep_idle(later, Duration::seconds(60));

        assert_eq!(outcome.close, vec![(bob, CloseReason::IdleTimeout)]);
        assert_eq!(host.connection_count(), 1);
    }

    #[test]
    fn unknown_connection_is_an_error() {
        let mut host = host();
        let wire = SessionMessage::KeepConnection.into_wire(host.chart().id()).unwrap();
        assert!(matches!(
            host.receive(ConnectionId::new(), wire, Timestamp::now()),
            Err(SessionError::UnknownConnection(_))
        ));
    }
}
