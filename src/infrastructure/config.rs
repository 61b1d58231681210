use crate::domain::classification::DomainRules;
use crate::domain::curation::Curation;
use crate::infrastructure::databricks::DatabricksCredentials;
use crate::infrastructure::http::{base_url, Secret};
use crate::infrastructure::preset::PresetCredentials;
use crate::infrastructure::tableau::TableauCredentials;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Non-secret settings come from `config/catalog.toml`; credentials come from
/// the environment, which also overrides anything in the file.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_tableau_api_version")]
    pub tableau_api_version: String,
    #[serde(default = "default_preset_auth_url")]
    pub preset_auth_url: String,
    #[serde(default)]
    pub classification: DomainRules,
    #[serde(default)]
    pub curation: Curation,

    tableau_server_url: Option<String>,
    tableau_site_id: Option<String>,
    tableau_token_name: Option<String>,
    tableau_token_value: Option<Secret>,

    preset_api_key: Option<Secret>,
    preset_api_secret: Option<Secret>,
    preset_workspace_url: Option<String>,

    databricks_host: Option<String>,
    databricks_token: Option<Secret>,
}

fn default_output_path() -> String {
    "catalog.html".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> u32 {
    100
}

fn default_tableau_api_version() -> String {
    "3.21".to_string()
}

fn default_preset_auth_url() -> String {
    "https://api.app.preset.io/v1/auth/".to_string()
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// An unparseable URL leaves the platform unconfigured.
fn present_url(setting: &str, value: &Option<String>) -> Option<Url> {
    let raw = present(value)?;
    match base_url(&raw) {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::warn!(setting, "ignoring invalid URL: {}", e);
            None
        }
    }
}

impl Settings {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn tableau_credentials(&self) -> Option<TableauCredentials> {
        Some(TableauCredentials {
            server_url: present_url("tableau_server_url", &self.tableau_server_url)?,
            site_id: present(&self.tableau_site_id)?,
            token_name: present(&self.tableau_token_name)?,
            token_value: Secret::present(&self.tableau_token_value)?,
        })
    }

    pub fn preset_credentials(&self) -> Option<PresetCredentials> {
        Some(PresetCredentials {
            api_key: Secret::present(&self.preset_api_key)?,
            api_secret: Secret::present(&self.preset_api_secret)?,
            workspace_url: present_url("preset_workspace_url", &self.preset_workspace_url)?,
        })
    }

    pub fn databricks_credentials(&self) -> Option<DatabricksCredentials> {
        Some(DatabricksCredentials {
            host: present_url("databricks_host", &self.databricks_host)?,
            token: Secret::present(&self.databricks_token)?,
        })
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    build_settings("config/catalog", None)
}

/// `env` replaces the process environment when given.
fn build_settings(file: &str, env: Option<HashMap<String, String>>) -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(file).required(false))
        .add_source(config::Environment::default().source(env))
        .build()?;

    Ok(settings.try_deserialize()?)
}
