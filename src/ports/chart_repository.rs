//! Chart repository port - persistence of charts and users.
//!
//! The password is an opaque credential checked by the implementation.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

use crate::domain::chart::Chart;
use crate::domain::foundation::{ChartId, DomainError, ErrorCode};
use crate::domain::preference::User;

/// Errors raised by chart persistence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    #[error("Chart not found: {0}")]
    NotFound(ChartId),

    #[error("Invalid password for chart {0}")]
    InvalidPassword(ChartId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<RepositoryError> for DomainError {
    fn from(err: RepositoryError) -> Self {
        let code = match &err {
            RepositoryError::NotFound(_) => ErrorCode::ChartNotFound,
            RepositoryError::InvalidPassword(_) => ErrorCode::Unauthorized,
            RepositoryError::Storage(_) => ErrorCode::StorageError,
        };
        DomainError::new(code, err.to_string())
    }
}

/// Repository port for chart persistence.
#[async_trait]
pub trait ChartRepository: Send + Sync {
    /// Load a chart, users included.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no chart has this id
    /// - `InvalidPassword` if the credential does not match
    async fn load_chart_structure(
        &self,
        id: ChartId,
        password: &SecretString,
    ) -> Result<Chart, RepositoryError>;

    /// Store the chart's structure and users, returning what was stored.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the chart was never created
    async fn save_chart_structure(&self, chart: &Chart) -> Result<Chart, RepositoryError>;

    /// Insert or replace one user of a chart, returning what was stored.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the chart was never created
    async fn save_user(&self, chart_id: ChartId, user: &User) -> Result<User, RepositoryError>;
}
