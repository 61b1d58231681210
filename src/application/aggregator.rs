// Aggregator - Runs every source in turn and merges their records
use crate::application::dashboard_source::{DashboardSource, SourceError};
use crate::domain::dashboard::{DashboardRecord, SourceKind};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Fetched { count: usize },
    Skipped,
    Unavailable { reason: String },
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: SourceKind,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub records: Vec<DashboardRecord>,
    pub reports: Vec<SourceReport>,
}

/// Call each source sequentially. A failing or unconfigured source contributes
/// nothing and never stops the others.
pub async fn aggregate(sources: &[Arc<dyn DashboardSource>], now: DateTime<Utc>) -> Aggregation {
    let mut aggregation = Aggregation::default();

    for source in sources {
        let kind = source.kind();
        let outcome = match source.list_dashboards().await {
            Ok(records) => {
                tracing::info!(source = %kind, count = records.len(), "fetched dashboards");
                let count = records.len();
                aggregation.records.extend(records.into_iter().map(|mut r| {
                    r.refresh(now);
                    r
                }));
                SourceOutcome::Fetched { count }
            }
            Err(SourceError::CredentialsMissing) => {
                tracing::info!(source = %kind, "credentials not configured, skipping");
                SourceOutcome::Skipped
            }
            Err(SourceError::Unavailable(reason)) => {
                tracing::error!(source = %kind, "source unavailable: {}", reason);
                SourceOutcome::Unavailable { reason }
            }
        };
        aggregation.reports.push(SourceReport { source: kind, outcome });
    }

    aggregation
}
