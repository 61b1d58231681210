// Source trait for listing dashboards from one platform
use crate::domain::dashboard::{DashboardRecord, SourceKind};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Credentials absent or blank; the source is skipped for this run
    #[error("credentials not configured")]
    CredentialsMissing,

    /// API unreachable, non-2xx, timed out, or returned an unreadable envelope
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait DashboardSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Authenticate, walk every page and return the normalized records
    async fn list_dashboards(&self) -> Result<Vec<DashboardRecord>, SourceError>;
}
