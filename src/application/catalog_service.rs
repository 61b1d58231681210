// Catalog service - Use case for building the dashboard catalog
use crate::application::aggregator::{aggregate, SourceReport};
use crate::application::dashboard_source::DashboardSource;
use crate::domain::classification::{is_listable, DomainRules};
use crate::domain::curation::Curation;
use crate::domain::dashboard::DashboardRecord;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Catalog {
    pub generated_at: DateTime<Utc>,
    pub records: Vec<DashboardRecord>,
    pub reports: Vec<SourceReport>,
    pub domains: Vec<String>,
}

#[derive(Clone)]
pub struct CatalogService {
    sources: Vec<Arc<dyn DashboardSource>>,
    rules: DomainRules,
    curation: Curation,
}

impl CatalogService {
    pub fn new(
        sources: Vec<Arc<dyn DashboardSource>>,
        rules: DomainRules,
        curation: Curation,
    ) -> Self {
        Self {
            sources,
            rules,
            curation,
        }
    }

    pub async fn build(&self, now: DateTime<Utc>) -> Catalog {
        let aggregation = aggregate(&self.sources, now).await;

        let mut records = aggregation.records;
        for record in &mut records {
            record.domains = self.rules.infer(record);
            record.quality = is_listable(&record.name, record.published);
            self.curation.apply(record);
        }

        Catalog {
            generated_at: now,
            records,
            reports: aggregation.reports,
            domains: self.known_domains(),
        }
    }

    fn known_domains(&self) -> Vec<String> {
        let mut domains = self.rules.known_domains();
        for label in self.curation.domain_labels() {
            if !domains.iter().any(|d| d == label) {
                domains.push(label.to_string());
            }
        }
        domains
    }
}
