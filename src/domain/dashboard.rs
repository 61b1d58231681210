// Dashboard domain model
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Dashboards not touched for longer than this are considered stale.
pub const STALE_AFTER_DAYS: i64 = 30;

/// Platform a dashboard was listed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// BI visualization server
    Tableau,
    /// Hosted Superset dashboarding service
    Preset,
    /// Lakehouse notebook platform (Lakeview dashboards)
    Databricks,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Tableau => "tableau",
            SourceKind::Preset => "preset",
            SourceKind::Databricks => "databricks",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::Tableau => "Tableau",
            SourceKind::Preset => "Preset",
            SourceKind::Databricks => "Databricks",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Active,
    Stale,
    Unknown,
}

impl Freshness {
    pub fn classify(updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match updated_at {
            None => Freshness::Unknown,
            Some(ts) if now - ts <= Duration::days(STALE_AFTER_DAYS) => Freshness::Active,
            Some(_) => Freshness::Stale,
        }
    }
}

/// Raised when an API item cannot become a record. The item is dropped.
#[derive(Debug, Error, PartialEq)]
pub enum MalformedRecord {
    #[error("missing dashboard name")]
    MissingName,
    #[error("missing dashboard url for {0:?}")]
    MissingUrl(String),
    #[error("undecodable item: {0}")]
    Undecodable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRecord {
    pub source: SourceKind,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub project_or_workspace: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub freshness: Freshness,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub owner_display: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default = "default_quality")]
    pub quality: bool,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
}

fn default_quality() -> bool {
    true
}

impl DashboardRecord {
    /// Build a record, trimming name and url. Both must be non-empty.
    pub fn new(source: SourceKind, name: &str, url: &str) -> Result<Self, MalformedRecord> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MalformedRecord::MissingName);
        }
        let url = url.trim();
        if url.is_empty() {
            return Err(MalformedRecord::MissingUrl(name.to_string()));
        }

        Ok(Self {
            source,
            name: name.to_string(),
            url: url.to_string(),
            project_or_workspace: None,
            updated_at: None,
            freshness: Freshness::Unknown,
            owner: None,
            owner_display: None,
            description: None,
            published: None,
            domains: Vec::new(),
            quality: true,
            featured: false,
            tags: Vec::new(),
            teams: Vec::new(),
        })
    }

    pub fn with_project(mut self, project: Option<String>) -> Self {
        self.project_or_workspace = non_blank(project);
        self
    }

    pub fn with_updated_at(mut self, updated_at: Option<DateTime<Utc>>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = non_blank(owner);
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_blank(description);
        self
    }

    pub fn with_published(mut self, published: Option<bool>) -> Self {
        self.published = published;
        self
    }

    /// Recompute freshness against the run's clock.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.freshness = Freshness::classify(self.updated_at, now);
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
