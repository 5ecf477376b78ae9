//! In-Memory Chart Repository Adapter
//!
//! Keeps charts in a map keyed by id. Passwords are stored as SHA-256 digests
//! and compared in constant time.

use async_trait::async_trait;
use serde::Deserialize;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::domain::chart::Chart;
use crate::domain::foundation::ChartId;
use crate::domain::preference::User;
use crate::ports::{ChartRepository, RepositoryError};

#[derive(Debug, Clone)]
struct StoredChart {
    chart: Chart,
    password_digest: [u8; 32],
}

/// In-memory chart store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChartRepository {
    charts: Arc<RwLock<HashMap<ChartId, StoredChart>>>,
}

fn digest(password: &SecretString) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(password.expose_secret().as_bytes());
    hasher.finalize().into()
}

impl InMemoryChartRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a chart protected by `password`.
    pub async fn insert(&self, chart: Chart, password: &SecretString) {
        let stored = StoredChart {
            password_digest: digest(password),
            chart,
        };
        self.charts.write().await.insert(stored.chart.id(), stored);
    }

    /// Reads a chart without a password check (useful for tests)
    pub async fn get(&self, id: ChartId) -> Option<Chart> {
        self.charts.read().await.get(&id).map(|s| s.chart.clone())
    }

    pub async fn chart_count(&self) -> usize {
        self.charts.read().await.len()
    }

    /// Inserts every chart of a JSON seed document, returning how many.
    ///
    /// The document is an array of `{"password": .., "chart": ..}` objects.
    pub async fn seed_from_json(&self, json: &str) -> Result<usize, RepositoryError> {
        let seeds: Vec<SeedChart> =
            serde_json::from_str(json).map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let count = seeds.len();
        for seed in seeds {
            self.insert(seed.chart, &seed.password).await;
        }
        Ok(count)
    }
}

#[derive(Deserialize)]
struct SeedChart {
    password: SecretString,
    chart: Chart,
}

#[async_trait]
impl ChartRepository for InMemoryChartRepository {
    async fn load_chart_structure(
        &self,
        id: ChartId,
        password: &SecretString,
    ) -> Result<Chart, RepositoryError> {
        let charts = self.charts.read().await;
        let stored = charts.get(&id).ok_or(RepositoryError::NotFound(id))?;
        let matches: bool = stored.password_digest.ct_eq(&digest(password)).into();
        if !matches {
            return Err(RepositoryError::InvalidPassword(id));
        }
        Ok(stored.chart.clone())
    }

    async fn save_chart_structure(&self, chart: &Chart) -> Result<Chart, RepositoryError> {
        let mut charts = self.charts.write().await;
        let stored = charts
            .get_mut(&chart.id())
            .ok_or(RepositoryError::NotFound(chart.id()))?;
        stored.chart = chart.clone();
        Ok(stored.chart.clone())
    }

    async fn save_user(&self, chart_id: ChartId, user: &User) -> Result<User, RepositoryError> {
        let mut charts = self.charts.write().await;
        let stored = charts
            .get_mut(&chart_id)
            .ok_or(RepositoryError::NotFound(chart_id))?;
        stored.chart.upsert_user(user.clone());
        Ok(user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::ChartStructure;
    use crate::domain::objective::{Domain, Objective};

    fn chart() -> Chart {
        let root = Objective::group(
            "root",
            "Root",
            vec![Objective::primitive("rate", "Rate", Domain::continuous(0.0, 1.0))],
        );
        Chart::new(ChartStructure::new(ChartId::new(), "Hotels", "owner", root))
    }

    fn password(s: &str) -> SecretString {
        SecretString::new(s.to_string())
    }

    #[tokio::test]
    async fn loads_with_correct_password() {
        let repo = InMemoryChartRepository::new();
        let chart = chart();
        repo.insert(chart.clone(), &password("hunter2")).await;

        let loaded = repo.load_chart_structure(chart.id(), &password("hunter2")).await;
        assert_eq!(loaded, Ok(chart));
    }

    #[tokio::test]
    async fn rejects_wrong_password() {
        let repo = InMemoryChartRepository::new();
        let chart = chart();
        repo.insert(chart.clone(), &password("hunter2")).await;

        let result = repo.load_chart_structure(chart.id(), &password("guess")).await;
        assert_eq!(result, Err(RepositoryError::InvalidPassword(chart.id())));
    }

    #[tokio::test]
    async fn unknown_chart_is_not_found() {
        let repo = InMemoryChartRepository::new();
        let id = ChartId::new();
        assert_eq!(
            repo.load_chart_structure(id, &password("x")).await,
            Err(RepositoryError::NotFound(id))
        );
        assert!(repo.save_chart_structure(&chart()).await.is_err());
    }

    #[tokio::test]
    async fn seeds_from_json() {
        let repo = InMemoryChartRepository::new();
        let chart = chart();
        let json = serde_json::json!([{ "password": "pw", "chart": chart }]).to_string();

        assert_eq!(repo.seed_from_json(&json).await, Ok(1));
        assert_eq!(repo.load_chart_structure(chart.id(), &password("pw")).await, Ok(chart));
        assert!(repo.seed_from_json("not json").await.is_err());
    }

    #[tokio::test]
    async fn save_user_upserts_into_stored_chart() {
        let repo = InMemoryChartRepository::new();
        let chart = chart();
        repo.insert(chart.clone(), &password("pw")).await;
        let bob = User::with_defaults("bob", chart.root_objective()).unwrap();

        repo.save_user(chart.id(), &bob).await.unwrap();

        let stored = repo.get(chart.id()).await.unwrap();
        assert_eq!(stored.user("bob"), Some(&bob));
    }
}
