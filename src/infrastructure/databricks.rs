// Databricks Lakeview dashboards source (static bearer token)
use crate::application::dashboard_source::{DashboardSource, SourceError};
use crate::domain::dashboard::{DashboardRecord, MalformedRecord, SourceKind};
use crate::infrastructure::http::{
    endpoint, normalize_items, read_json, send_error, Secret, MAX_PAGES,
};
use crate::infrastructure::timestamps::parse_optional;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

const TRASHED: &str = "TRASHED";

#[derive(Debug, Clone)]
pub struct DatabricksCredentials {
    pub host: Url,
    pub token: Secret,
}

#[derive(Debug, Clone)]
pub struct DatabricksSource {
    client: reqwest::Client,
    credentials: Option<DatabricksCredentials>,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    dashboards: Vec<Value>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LakeviewDashboard {
    #[serde(default)]
    dashboard_id: String,
    display_name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    parent_path: Option<String>,
    #[serde(default)]
    create_time: Option<String>,
    #[serde(default)]
    update_time: Option<String>,
    #[serde(default)]
    lifecycle_state: Option<String>,
}

impl DatabricksSource {
    pub fn new(
        client: reqwest::Client,
        credentials: Option<DatabricksCredentials>,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            credentials,
            page_size,
        }
    }

    async fn list_raw(&self, creds: &DatabricksCredentials) -> Result<Vec<Value>, SourceError> {
        let url = endpoint(&creds.host, "api/2.0/lakeview/dashboards")?;
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 0..MAX_PAGES {
            let mut query = vec![("page_size", self.page_size.to_string())];
            if let Some(token) = &page_token {
                query.push(("page_token", token.clone()));
            }

            let response = self
                .client
                .get(url.clone())
                .bearer_auth(creds.token.expose())
                .header("Accept", "application/json")
                .query(&query)
                .send()
                .await
                .map_err(|e| send_error("Databricks dashboard listing", e))?;

            let body: ListResponse = read_json(response, "Databricks dashboard listing").await?;
            tracing::debug!(page, fetched = body.dashboards.len(), "databricks dashboards page");
            items.extend(body.dashboards);

            page_token = body.next_page_token.filter(|t| !t.is_empty());
            if page_token.is_none() {
                return Ok(items);
            }
        }

        tracing::warn!("Databricks listing stopped after {} pages", MAX_PAGES);
        Ok(items)
    }

    /// The list endpoint may omit the workspace path; the detail endpoint has it.
    async fn lookup_path(
        &self,
        creds: &DatabricksCredentials,
        dashboard_id: &str,
    ) -> Option<String> {
        match self.fetch_detail(creds, dashboard_id).await {
            Ok(detail) => detail.path.filter(|p| !p.is_empty()),
            Err(e) => {
                tracing::debug!(dashboard_id, "path lookup failed: {}", e);
                None
            }
        }
    }

    async fn fetch_detail(
        &self,
        creds: &DatabricksCredentials,
        dashboard_id: &str,
    ) -> Result<DetailResponse, SourceError> {
        let path = format!(
            "api/2.0/lakeview/dashboards/{}",
            urlencoding::encode(dashboard_id)
        );
        let response = self
            .client
            .get(endpoint(&creds.host, &path)?)
            .bearer_auth(creds.token.expose())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| send_error("Databricks dashboard detail", e))?;

        read_json(response, "Databricks dashboard detail").await
    }

    async fn fill_missing_paths(&self, creds: &DatabricksCredentials, items: &mut [Value]) {
        for item in items.iter_mut() {
            let Some(obj) = item.as_object_mut() else {
                continue;
            };
            let text = |key: &str| obj.get(key).and_then(Value::as_str).map(str::trim);
            let has_path = text("path").is_some_and(|p| !p.is_empty());
            let trashed = text("lifecycle_state") == Some(TRASHED);
            // items normalization will drop are not worth a request
            let named = text("display_name").is_some_and(|n| !n.is_empty());
            if has_path || trashed || !named {
                continue;
            }
            let Some(id) = text("dashboard_id").filter(|id| !id.is_empty()).map(str::to_string)
            else {
                continue;
            };
            if let Some(path) = self.lookup_path(creds, &id).await {
                obj.insert("path".to_string(), Value::String(path));
            }
        }
    }
}

/// Email segment of a `/Users/<email>/...` workspace path.
fn owner_from_path(path: &str) -> Option<String> {
    let (_, rest) = path.split_once("/Users/")?;
    let user = rest.split('/').next()?;
    user.contains('@').then(|| user.to_string())
}

fn folder_of(path: &str) -> Option<String> {
    path.rsplit_once('/')
        .map(|(dir, _)| dir.to_string())
        .filter(|dir| !dir.is_empty())
}

fn dashboard_url(host: &Url, dashboard_id: &str) -> String {
    let path = format!("sql/dashboardsv3/{}", urlencoding::encode(dashboard_id));
    host.join(&path).map(String::from).unwrap_or_default()
}

fn normalize(
    host: &Url,
    dashboard: LakeviewDashboard,
) -> Result<Option<DashboardRecord>, MalformedRecord> {
    if dashboard.lifecycle_state.as_deref() == Some(TRASHED) {
        return Ok(None);
    }

    let id = dashboard.dashboard_id.trim();
    let url = if id.is_empty() {
        String::new()
    } else {
        dashboard_url(host, id)
    };
    let updated_at = parse_optional(dashboard.update_time.as_deref())
        .or_else(|| parse_optional(dashboard.create_time.as_deref()));
    let path = dashboard.path.as_deref().unwrap_or_default();
    let folder = dashboard
        .parent_path
        .clone()
        .filter(|p| !p.is_empty())
        .or_else(|| folder_of(path));

    let record = DashboardRecord::new(SourceKind::Databricks, &dashboard.display_name, &url)?
        .with_project(folder)
        .with_owner(owner_from_path(path))
        .with_updated_at(updated_at);
    Ok(Some(record))
}

#[async_trait]
impl DashboardSource for DatabricksSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Databricks
    }

    async fn list_dashboards(&self) -> Result<Vec<DashboardRecord>, SourceError> {
        let creds = self.credentials.as_ref().ok_or(SourceError::CredentialsMissing)?;

        let mut items = self.list_raw(creds).await?;
        self.fill_missing_paths(creds, &mut items).await;

        Ok(normalize_items(SourceKind::Databricks, items, |d: LakeviewDashboard| {
            normalize(&creds.host, d)
        }))
    }
}
