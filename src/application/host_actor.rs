//! HostActor - one tokio task per live chart session.
//!
//! The actor owns the [`HostSession`] and is the only writer of the
//! authoritative chart. Connection tasks talk to it through a [`HostHandle`];
//! every command is processed to completion before the next one, so relays
//! reach each participant in the order the host applied them.
//!
//! Delivery never waits on a participant. A connection whose transport
//! reports an error is closed as failed, which removes its user like any
//! other lost connection.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::domain::chart::Chart;
use crate::domain::collaboration::{
    HostOutcome, HostSession, PersistRequest, SessionError, WireMessage,
};
use crate::domain::foundation::{ChartId, ConnectionId, DomainError, ErrorCode, Timestamp};
use crate::ports::{ChartRepository, ChartValidator, CloseReason, MessageTransport};

/// Errors returned to callers of a [`HostHandle`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("Session for chart {0} has ended")]
    SessionEnded(ChartId),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<HostError> for DomainError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::SessionEnded(_) => DomainError::new(ErrorCode::ConnectionLost, err.to_string()),
            HostError::Session(e) => e.into(),
        }
    }
}

/// Timing and buffering of a host session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostSettings {
    /// Connections silent for longer than this are closed.
    pub idle_timeout: Duration,
    /// How often idle connections are looked for.
    pub sweep_interval: Duration,
    pub channel_capacity: usize,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for HostSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            idle_timeout: config.idle_timeout(),
            sweep_interval: config.heartbeat_interval(),
            channel_capacity: config.channel_capacity,
        }
    }
}

#[derive(Debug)]
enum HostCommand {
    Connect {
        connection_id: ConnectionId,
        username: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Inbound {
        connection_id: ConnectionId,
        message: WireMessage,
    },
    Disconnect {
        connection_id: ConnectionId,
        failed: bool,
    },
    Snapshot {
        reply: oneshot::Sender<Chart>,
    },
    Shutdown,
}

/// Cloneable sender side of a host session.
#[derive(Debug, Clone)]
pub struct HostHandle {
    chart_id: ChartId,
    tx: mpsc::Sender<HostCommand>,
    ended: Arc<AtomicBool>,
}

impl HostHandle {
    pub fn chart_id(&self) -> ChartId {
        self.chart_id
    }

    /// True once the session has ended or the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.ended.load(Ordering::Acquire) || self.tx.is_closed()
    }

    async fn send(&self, command: HostCommand) -> Result<(), HostError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| HostError::SessionEnded(self.chart_id))
    }

    /// Joins `username` over a connection already registered with the
    /// transport. The connection receives `ConnectionInit` on success.
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        username: impl Into<String>,
    ) -> Result<(), HostError> {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::Connect {
            connection_id,
            username: username.into(),
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| HostError::SessionEnded(self.chart_id))?
            .map_err(HostError::from)
    }

    pub async fn inbound(
        &self,
        connection_id: ConnectionId,
        message: WireMessage,
    ) -> Result<(), HostError> {
        self.send(HostCommand::Inbound {
            connection_id,
            message,
        })
        .await
    }

    pub async fn disconnect(&self, connection_id: ConnectionId, failed: bool) -> Result<(), HostError> {
        self.send(HostCommand::Disconnect {
            connection_id,
            failed,
        })
        .await
    }

    /// Current authoritative chart.
    pub async fn chart(&self) -> Result<Chart, HostError> {
        let (reply, rx) = oneshot::channel();
        self.send(HostCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| HostError::SessionEnded(self.chart_id))
    }

    /// Ends the session, closing every connection normally.
    pub async fn shutdown(&self) -> Result<(), HostError> {
        self.send(HostCommand::Shutdown).await
    }
}

/// The task body behind a [`HostHandle`].
pub struct HostActor {
    session: HostSession,
    repository: Arc<dyn ChartRepository>,
    transport: Arc<dyn MessageTransport>,
    settings: HostSettings,
    ended: Arc<AtomicBool>,
}

impl HostActor {
    /// Starts hosting `chart` on a new task.
    pub fn spawn(
        chart: Chart,
        validator: Arc<dyn ChartValidator>,
        repository: Arc<dyn ChartRepository>,
        transport: Arc<dyn MessageTransport>,
        settings: HostSettings,
    ) -> (HostHandle, JoinHandle<()>) {
        let chart_id = chart.id();
        let (tx, rx) = mpsc::channel(settings.channel_capacity.max(1));
        let ended = Arc::new(AtomicBool::new(false));
        let actor = Self {
            session: HostSession::new(chart, validator),
            repository,
            transport,
            settings,
            ended: ended.clone(),
        };
        info!(chart_id = %chart_id, "Host session started");
        let task = tokio::spawn(actor.run(rx));
        (HostHandle { chart_id, tx, ended }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<HostCommand>) {
        let mut sweep = tokio::time::interval(self.settings.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let idle_timeout = chrono::Duration::from_std(self.settings.idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));

        while !self.session.is_ended() {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = sweep.tick() => {
                    let outcome = self.session.sweep_idle(Timestamp::now(), idle_timeout);
                    self.execute(outcome).await;
                }
            }
        }
        info!(chart_id = %self.session.chart().id(), "Host session stopped");
    }

    async fn handle(&mut self, command: HostCommand) {
        let chart_id = self.session.chart().id();
        match command {
            HostCommand::Connect {
                connection_id,
                username,
                reply,
            } => {
                let result = self.session.open(connection_id, username, Timestamp::now());
                let (result, outcome) = match result {
                    Ok(outcome) => (Ok(()), Some(outcome)),
                    Err(e) => (Err(e), None),
                };
                if let Some(outcome) = outcome {
                    self.execute(outcome).await;
                }
                let _ = reply.send(result);
            }
            HostCommand::Inbound {
                connection_id,
                message,
            } => {
                let kind = message.kind;
                match self.session.receive(connection_id, message, Timestamp::now()) {
                    Ok(outcome) => self.execute(outcome).await,
                    Err(e) => warn!(
                        chart_id = %chart_id,
                        connection_id = %connection_id,
                        message_type = %kind,
                        error = %e,
                        "Message rejected"
                    ),
                }
            }
            HostCommand::Disconnect {
                connection_id,
                failed,
            } => match self.session.close(connection_id, failed) {
                Ok(outcome) => self.execute(outcome).await,
                Err(e) => debug!(connection_id = %connection_id, error = %e, "Disconnect ignored"),
            },
            HostCommand::Snapshot { reply } => {
                let _ = reply.send(self.session.chart().clone());
            }
            HostCommand::Shutdown => {
                let outcome = self.session.stop();
                self.execute(outcome).await;
            }
        }
    }

    /// Carries out `outcome` and the closes of any connection that failed
    /// to take its deliveries.
    async fn execute(&mut self, outcome: HostOutcome) {
        let mut pending = VecDeque::from([outcome]);
        while let Some(outcome) = pending.pop_front() {
            for connection_id in self.carry_out(outcome).await {
                match self.session.close(connection_id, true) {
                    Ok(mut follow_up) => {
                        warn!(connection_id = %connection_id, "Dropping lagging connection");
                        follow_up.close.push((connection_id, CloseReason::Lagging));
                        pending.push_back(follow_up);
                    }
                    Err(e) => debug!(connection_id = %connection_id, error = %e, "Already closed"),
                }
            }
        }
    }

    /// Delivers, persists and closes, in that order.
    ///
    /// Returns the connections that could not take a delivery.
    async fn carry_out(&self, outcome: HostOutcome) -> Vec<ConnectionId> {
        let chart_id = self.session.chart().id();
        if outcome.session_ended {
            self.ended.store(true, Ordering::Release);
        }

        let mut failed: Vec<ConnectionId> = Vec::new();
        for delivery in outcome.deliveries {
            for connection_id in self.session.recipients(delivery.recipient) {
                if failed.contains(&connection_id) {
                    continue;
                }
                if let Err(e) = self
                    .transport
                    .send(connection_id, delivery.message.clone())
                    .await
                {
                    debug!(connection_id = %connection_id, error = %e, "Delivery failed");
                    failed.push(connection_id);
                }
            }
        }

        for request in outcome.persist {
            let result = match &request {
                PersistRequest::User(user) => self
                    .repository
                    .save_user(chart_id, user)
                    .await
                    .map(|_| ()),
                PersistRequest::Chart(chart) => self
                    .repository
                    .save_chart_structure(chart)
                    .await
                    .map(|_| ()),
            };
            if let Err(e) = result {
                error!(chart_id = %chart_id, error = %e, "Failed to persist session change");
            }
        }

        for (connection_id, reason) in outcome.close {
            if let Err(e) = self.transport.close(connection_id, reason).await {
                debug!(connection_id = %connection_id, error = %e, "Close failed");
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{ChannelTransport, InMemoryChartRepository, Outbound};
    use crate::adapters::validation::StandardChartValidator;
    use crate::domain::chart::{Alternative, ChartStructure};
    use crate::domain::collaboration::{MessageType, SessionMessage};
    use crate::domain::objective::{Domain, Objective};
    use crate::domain::preference::User;
    use crate::ports::CloseReason;
    use secrecy::SecretString;

    fn chart() -> Chart {
        let root = Objective::group(
            "hotel",
            "Hotel",
            vec![
                Objective::primitive("area", "Area", Domain::categorical(["nightlife", "airport"])),
                Objective::primitive("rate", "Rate", Domain::continuous(100.0, 200.0)),
            ],
        );
        let mut s = ChartStructure::new(ChartId::new(), "Hotels", "owner", root);
        s.alternatives = vec![Alternative::new("Sheraton")
            .with_value("area", "airport")
            .with_value("rate", 120.0)];
        Chart::new(s)
    }

    async fn start() -> (HostHandle, ChannelTransport, InMemoryChartRepository, Chart) {
        let chart = chart();
        let repository = InMemoryChartRepository::new();
        repository
            .insert(chart.clone(), &SecretString::new("pw".to_string()))
            .await;
        let transport = ChannelTransport::new(16);
        let (handle, _task) = HostActor::spawn(
            chart.clone(),
            Arc::new(StandardChartValidator::new()),
            Arc::new(repository.clone()),
            Arc::new(transport.clone()),
            HostSettings::default(),
        );
        (handle, transport, repository, chart)
    }

    async fn expect_message(rx: &mut mpsc::Receiver<Outbound>) -> WireMessage {
        match rx.recv().await {
            Some(Outbound::Message(m)) => m,
            other => panic!("expected message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn connect_sends_connection_init() {
        let (handle, transport, _, _) = start().await;
        let id = ConnectionId::new();
        let mut rx = transport.register(id).await;

        handle.connect(id, "bob").await.unwrap();

        assert_eq!(expect_message(&mut rx).await.kind, MessageType::ConnectionInit);
    }

    #[tokio::test]
    async fn accepted_user_is_relayed_and_saved() {
        let (handle, transport, repository, chart) = start().await;
        let bob = ConnectionId::new();
        let carol = ConnectionId::new();
        let mut bob_rx = transport.register(bob).await;
        let mut carol_rx = transport.register(carol).await;
        handle.connect(bob, "bob").await.unwrap();
        handle.connect(carol, "carol").await.unwrap();
        expect_message(&mut bob_rx).await;
        expect_message(&mut carol_rx).await;

        let user = User::with_defaults("bob", chart.root_objective()).unwrap();
        let wire = SessionMessage::UserAdded(user).into_wire(chart.id()).unwrap();
        handle.inbound(bob, wire).await.unwrap();

        assert_eq!(expect_message(&mut carol_rx).await.kind, MessageType::UserAdded);
        let live = handle.chart().await.unwrap();
        assert!(live.user("bob").is_some());
        let stored = repository.get(chart.id()).await.unwrap();
        assert!(stored.user("bob").is_some());
    }

    #[tokio::test]
    async fn stalled_participant_is_dropped_without_blocking_others() {
        let chart = chart();
        let repository = InMemoryChartRepository::new();
        repository
            .insert(chart.clone(), &SecretString::new("pw".to_string()))
            .await;
        let transport = ChannelTransport::new(1);
        let (handle, _task) = HostActor::spawn(
            chart.clone(),
            Arc::new(StandardChartValidator::new()),
            Arc::new(repository),
            Arc::new(transport.clone()),
            HostSettings::default(),
        );
        let stalled = ConnectionId::new();
        let bob = ConnectionId::new();
        let mut stalled_rx = transport.register(stalled).await;
        let mut bob_rx = transport.register(bob).await;
        handle.connect(stalled, "carol").await.unwrap();
        handle.connect(bob, "bob").await.unwrap();
        expect_message(&mut bob_rx).await;

        // carol's channel is still full with her connection_init
        let user = User::with_defaults("bob", chart.root_objective()).unwrap();
        let wire = SessionMessage::UserAdded(user).into_wire(chart.id()).unwrap();
        handle.inbound(bob, wire).await.unwrap();
        let heartbeat = SessionMessage::KeepConnection.into_wire(chart.id()).unwrap();
        handle.inbound(bob, heartbeat).await.unwrap();

        let echo = tokio::time::timeout(Duration::from_secs(2), expect_message(&mut bob_rx))
            .await
            .expect("host keeps serving bob");
        assert_eq!(echo.kind, MessageType::KeepConnection);
        let live = tokio::time::timeout(Duration::from_secs(2), handle.chart())
            .await
            .expect("host answers snapshots")
            .unwrap();
        assert!(live.user("bob").is_some());
        assert_eq!(transport.connection_count().await, 1);
        assert_eq!(expect_message(&mut stalled_rx).await.kind, MessageType::ConnectionInit);
        assert_eq!(stalled_rx.recv().await, None);
    }

    #[tokio::test]
    async fn owner_disconnect_closes_everyone() {
        let (handle, transport, _, _) = start().await;
        let owner = ConnectionId::new();
        let bob = ConnectionId::new();
        let _owner_rx = transport.register(owner).await;
        let mut bob_rx = transport.register(bob).await;
        handle.connect(owner, "owner").await.unwrap();
        handle.connect(bob, "bob").await.unwrap();
        expect_message(&mut bob_rx).await;

        handle.disconnect(owner, false).await.unwrap();

        assert_eq!(bob_rx.recv().await, Some(Outbound::Close(CloseReason::Normal)));
        let refused = handle.connect(ConnectionId::new(), "dave").await.unwrap_err();
        assert_eq!(DomainError::from(refused).code, ErrorCode::ConnectionLost);
    }
}
