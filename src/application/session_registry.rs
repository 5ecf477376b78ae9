//! SessionRegistry - finds or starts the host session of a chart.

use std::collections::HashMap;
use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::RwLock;
use tracing::info;

use crate::domain::foundation::ChartId;
use crate::ports::{ChartRepository, ChartValidator, MessageTransport, RepositoryError};

use super::host_actor::{HostActor, HostHandle, HostSettings};

/// One live host session per chart.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<ChartId, HostHandle>>,
    repository: Arc<dyn ChartRepository>,
    validator: Arc<dyn ChartValidator>,
    transport: Arc<dyn MessageTransport>,
    settings: HostSettings,
}

impl SessionRegistry {
    pub fn new(
        repository: Arc<dyn ChartRepository>,
        validator: Arc<dyn ChartValidator>,
        transport: Arc<dyn MessageTransport>,
        settings: HostSettings,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            repository,
            validator,
            transport,
            settings,
        }
    }

    /// Returns the running session of `chart_id`, starting one if needed.
    ///
    /// The password is checked on every join, even when a session is
    /// already running.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the chart does not exist
    /// - `InvalidPassword` if the credential does not match
    pub async fn join(
        &self,
        chart_id: ChartId,
        password: &SecretString,
    ) -> Result<HostHandle, RepositoryError> {
        let chart = self
            .repository
            .load_chart_structure(chart_id, password)
            .await?;

        let mut sessions = self.sessions.write().await;
        if let Some(handle) = sessions.get(&chart_id).filter(|h| !h.is_closed()) {
            return Ok(handle.clone());
        }

        info!(chart_id = %chart_id, users = chart.users().len(), "Starting host session");
        let (handle, _task) = HostActor::spawn(
            chart,
            self.validator.clone(),
            self.repository.clone(),
            self.transport.clone(),
            self.settings,
        );
        sessions.insert(chart_id, handle.clone());
        Ok(handle)
    }

    /// Number of sessions whose actor is still running.
    pub async fn active_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, handle| !handle.is_closed());
        sessions.len()
    }

    /// Ends every running session.
    pub async fn shutdown_all(&self) {
        let sessions: Vec<HostHandle> = self.sessions.write().await.drain().map(|(_, h)| h).collect();
        for handle in sessions {
            let _ = handle.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{ChannelTransport, InMemoryChartRepository};
    use crate::adapters::validation::StandardChartValidator;
    use crate::domain::chart::{Chart, ChartStructure};
    use crate::domain::objective::{Domain, Objective};

    async fn registry() -> (SessionRegistry, ChartId) {
        let root = Objective::group(
            "root",
            "Root",
            vec![Objective::primitive("rate", "Rate", Domain::continuous(0.0, 1.0))],
        );
        let chart = Chart::new(ChartStructure::new(ChartId::new(), "Hotels", "owner", root));
        let id = chart.id();
        let repository = InMemoryChartRepository::new();
        repository
            .insert(chart, &SecretString::new("pw".to_string()))
            .await;
        let registry = SessionRegistry::new(
            Arc::new(repository),
            Arc::new(StandardChartValidator::new()),
            Arc::new(ChannelTransport::default()),
            HostSettings::default(),
        );
        (registry, id)
    }

    #[tokio::test]
    async fn second_join_reuses_session() {
        let (registry, id) = registry().await;
        let pw = SecretString::new("pw".to_string());

        let first = registry.join(id, &pw).await.unwrap();
        let second = registry.join(id, &pw).await.unwrap();

        assert_eq!(first.chart_id(), second.chart_id());
        assert_eq!(registry.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let (registry, id) = registry().await;
        let result = registry.join(id, &SecretString::new("nope".to_string())).await;
        assert!(matches!(result, Err(RepositoryError::InvalidPassword(_))));
        assert_eq!(registry.active_sessions().await, 0);
    }
}
