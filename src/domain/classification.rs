// Domain labels and listing quality derived from dashboard metadata
use serde::Deserialize;
use std::collections::HashMap;

use super::dashboard::DashboardRecord;

#[derive(Debug, Deserialize, Clone)]
pub struct KeywordRule {
    pub domain: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DomainRules {
    #[serde(default = "default_domain")]
    pub default_domain: String,
    /// Exact project/workspace name to domain; authoritative when matched.
    #[serde(default)]
    pub projects: HashMap<String, String>,
    #[serde(default)]
    pub rules: Vec<KeywordRule>,
}

fn default_domain() -> String {
    "General".to_string()
}

impl Default for DomainRules {
    fn default() -> Self {
        Self {
            default_domain: default_domain(),
            projects: HashMap::new(),
            rules: Vec::new(),
        }
    }
}

impl DomainRules {
    pub fn infer(&self, record: &DashboardRecord) -> Vec<String> {
        if let Some(domain) = record
            .project_or_workspace
            .as_deref()
            .and_then(|p| self.project_domain(p))
        {
            return vec![domain.to_string()];
        }

        let name = record.name.to_lowercase();
        let mut domains: Vec<String> = Vec::new();
        for rule in &self.rules {
            let hit = rule
                .keywords
                .iter()
                .any(|kw| !kw.is_empty() && name.contains(&kw.to_lowercase()));
            if hit && !domains.contains(&rule.domain) {
                domains.push(rule.domain.clone());
            }
        }

        if domains.is_empty() {
            domains.push(self.default_domain.clone());
        }
        domains
    }

    // config may lowercase table keys, so project names match case-insensitively
    fn project_domain(&self, project: &str) -> Option<&str> {
        self.projects
            .get(project)
            .or_else(|| {
                self.projects
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(project))
                    .map(|(_, domain)| domain)
            })
            .map(String::as_str)
    }

    /// Every domain a record can end up with, in a stable order for the filter list.
    pub fn known_domains(&self) -> Vec<String> {
        let mut domains = vec![self.default_domain.clone()];
        let mut projects: Vec<&String> = self.projects.values().collect();
        projects.sort();
        for domain in self.rules.iter().map(|r| &r.domain).chain(projects) {
            if !domains.contains(domain) {
                domains.push(domain.clone());
            }
        }
        domains
    }
}

const PLACEHOLDER_NAMES: &[&str] = &[
    "test",
    "draft",
    "temp",
    "tmp",
    "untitled",
    "untitled dashboard",
];
const PLACEHOLDER_PREFIXES: &[&str] = &[
    "untitled", "copy of ", "[test]", "[draft]", "test ", "tmp ",
];
const PLACEHOLDER_SUFFIXES: &[&str] = &[" test", " tmp"];

/// False for scratch, placeholder or unpublished dashboards.
pub fn is_listable(name: &str, published: Option<bool>) -> bool {
    if published == Some(false) {
        return false;
    }
    let name = name.trim().to_lowercase();
    if name.is_empty() || PLACEHOLDER_NAMES.contains(&name.as_str()) {
        return false;
    }
    !(PLACEHOLDER_PREFIXES.iter().any(|p| name.starts_with(p))
        || PLACEHOLDER_SUFFIXES.iter().any(|s| name.ends_with(s)))
}
