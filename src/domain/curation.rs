// Hand-maintained labels layered over what the platforms report
use serde::Deserialize;

use super::dashboard::DashboardRecord;

/// A label and the dashboard names (case-insensitive) it applies to.
#[derive(Debug, Deserialize, Clone)]
pub struct Assignment {
    pub label: String,
    #[serde(default)]
    pub dashboards: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OwnerAlias {
    /// Owner identifier as reported by the platform, usually an email.
    pub owner: String,
    pub name: String,
    /// Teams this owner's dashboards fall under unless assigned explicitly.
    #[serde(default)]
    pub teams: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Curation {
    /// A dashboard is featured when its name contains any of these.
    #[serde(default)]
    pub featured: Vec<String>,
    /// Exact names kept out of the default listing.
    #[serde(default)]
    pub hidden: Vec<String>,
    /// Replace inferred domains.
    #[serde(default)]
    pub domains: Vec<Assignment>,
    #[serde(default)]
    pub tags: Vec<Assignment>,
    #[serde(default)]
    pub teams: Vec<Assignment>,
    #[serde(default)]
    pub owners: Vec<OwnerAlias>,
}

fn labels_for(assignments: &[Assignment], name: &str) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for assignment in assignments {
        let listed = assignment
            .dashboards
            .iter()
            .any(|d| d.trim().eq_ignore_ascii_case(name));
        if listed && !labels.contains(&assignment.label) {
            labels.push(assignment.label.clone());
        }
    }
    labels
}

/// Emails shorten to their local part; anything else is already a name.
fn display_owner(owner: &str) -> String {
    match owner.split_once('@') {
        Some((local, _)) if !local.is_empty() => local.to_string(),
        _ => owner.to_string(),
    }
}

impl Curation {
    /// Apply curated labels in place. Freshness is never touched.
    pub fn apply(&self, record: &mut DashboardRecord) {
        let name = record.name.as_str();
        let lowered = name.to_lowercase();

        record.featured = self.featured.iter().any(|f| {
            let f = f.trim().to_lowercase();
            !f.is_empty() && lowered.contains(&f)
        });

        let domains = labels_for(&self.domains, name);
        let tags = labels_for(&self.tags, name);
        let teams = labels_for(&self.teams, name);
        let hidden = self.hidden.iter().any(|h| h.trim().eq_ignore_ascii_case(name));

        let alias = record.owner.as_deref().and_then(|o| self.owner_alias(o));
        record.owner_display = alias
            .map(|a| a.name.clone())
            .or_else(|| record.owner.as_deref().map(display_owner));
        record.teams = if teams.is_empty() {
            alias.map(|a| a.teams.clone()).unwrap_or_default()
        } else {
            teams
        };

        if !domains.is_empty() {
            record.domains = domains;
        }
        record.tags = tags;
        if hidden {
            record.quality = false;
        }
    }

    fn owner_alias(&self, owner: &str) -> Option<&OwnerAlias> {
        let owner = owner.trim();
        self.owners
            .iter()
            .find(|alias| alias.owner.trim().eq_ignore_ascii_case(owner))
    }

    /// Domain labels only curation can produce, in configured order.
    pub fn domain_labels(&self) -> impl Iterator<Item = &str> {
        self.domains.iter().map(|a| a.label.as_str())
    }
}
