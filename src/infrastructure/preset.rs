// Preset (hosted Superset) source, API key/secret pair exchanged for a bearer JWT
use crate::application::dashboard_source::{DashboardSource, SourceError};
use crate::domain::dashboard::{DashboardRecord, MalformedRecord, SourceKind};
use crate::infrastructure::http::{
    endpoint, normalize_items, read_json, send_error, Secret, MAX_PAGES,
};
use crate::infrastructure::timestamps::parse_optional;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

#[derive(Debug, Clone)]
pub struct PresetCredentials {
    pub api_key: Secret,
    pub api_secret: Secret,
    pub workspace_url: Url,
}

#[derive(Debug, Clone)]
pub struct PresetSource {
    client: reqwest::Client,
    credentials: Option<PresetCredentials>,
    auth_url: String,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    payload: AuthPayload,
}

#[derive(Debug, Deserialize)]
struct AuthPayload {
    #[serde(alias = "access_token")]
    token: String,
}

#[derive(Debug, Deserialize)]
struct DashboardPage {
    #[serde(default)]
    count: usize,
    #[serde(default)]
    result: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PresetDashboard {
    dashboard_title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    changed_on_utc: Option<String>,
    #[serde(default)]
    changed_on: Option<String>,
    #[serde(default)]
    owners: Vec<PresetOwner>,
    #[serde(default)]
    published: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PresetOwner {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl PresetOwner {
    fn display_name(&self) -> Option<String> {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            self.username.clone()
        } else {
            Some(full)
        }
    }
}

impl PresetSource {
    pub fn new(
        client: reqwest::Client,
        credentials: Option<PresetCredentials>,
        auth_url: String,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            credentials,
            auth_url,
            page_size,
        }
    }

    async fn authenticate(&self, creds: &PresetCredentials) -> Result<Secret, SourceError> {
        let response = self
            .client
            .post(&self.auth_url)
            .json(&json!({
                "name": creds.api_key.expose(),
                "secret": creds.api_secret.expose(),
            }))
            .send()
            .await
            .map_err(|e| send_error("Preset auth", e))?;

        let auth: AuthResponse = read_json(response, "Preset auth").await?;
        Ok(Secret::new(auth.payload.token))
    }

    async fn list_raw(
        &self,
        creds: &PresetCredentials,
        token: &Secret,
    ) -> Result<Vec<Value>, SourceError> {
        let url = endpoint(&creds.workspace_url, "api/v1/dashboard/")?;
        let mut items = Vec::new();

        for page in 0..MAX_PAGES {
            let response = self
                .client
                .get(url.clone())
                .bearer_auth(token.expose())
                .header("Accept", "application/json")
                .query(&[("q", format!("(page:{},page_size:{})", page, self.page_size))])
                .send()
                .await
                .map_err(|e| send_error("Preset dashboard listing", e))?;

            let body: DashboardPage = read_json(response, "Preset dashboard listing").await?;
            let fetched = body.result.len();
            items.extend(body.result);

            tracing::debug!(page, fetched, total = body.count, "preset dashboards page");
            if fetched == 0 || items.len() >= body.count {
                return Ok(items);
            }
        }

        tracing::warn!("Preset listing stopped after {} pages", MAX_PAGES);
        Ok(items)
    }
}

/// Host of the workspace URL, used as the grouping label.
fn workspace_label(workspace_url: &Url) -> Option<String> {
    workspace_url.host_str().map(str::to_string)
}

/// Dashboard links come back relative to the workspace.
fn absolute_url(workspace_url: &Url, url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    match workspace_url.join(url) {
        Ok(joined) => joined.to_string(),
        Err(_) => url.to_string(),
    }
}

fn normalize(
    workspace_url: &Url,
    dashboard: PresetDashboard,
) -> Result<Option<DashboardRecord>, MalformedRecord> {
    let url = absolute_url(workspace_url, dashboard.url.as_deref().unwrap_or_default());
    let changed = dashboard
        .changed_on_utc
        .as_deref()
        .or(dashboard.changed_on.as_deref());

    let record = DashboardRecord::new(SourceKind::Preset, &dashboard.dashboard_title, &url)?
        .with_project(workspace_label(workspace_url))
        .with_owner(dashboard.owners.first().and_then(PresetOwner::display_name))
        .with_updated_at(parse_optional(changed))
        .with_published(dashboard.published);
    Ok(Some(record))
}

#[async_trait]
impl DashboardSource for PresetSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Preset
    }

    async fn list_dashboards(&self) -> Result<Vec<DashboardRecord>, SourceError> {
        let creds = self.credentials.as_ref().ok_or(SourceError::CredentialsMissing)?;

        let token = self.authenticate(creds).await?;
        let items = self.list_raw(creds, &token).await?;

        Ok(normalize_items(SourceKind::Preset, items, |d: PresetDashboard| {
            normalize(&creds.workspace_url, d)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::base_url;
    use mockito::{Matcher, Server};

    fn source(server: &Server, page_size: u32) -> PresetSource {
        PresetSource::new(
            reqwest::Client::new(),
            Some(PresetCredentials {
                api_key: Secret::new("key-id"),
                api_secret: Secret::new("key-secret"),
                workspace_url: base_url(&server.url()).unwrap(),
            }),
            format!("{}/v1/auth/", server.url()),
            page_size,
        )
    }

    async fn mock_auth(server: &mut Server) -> mockito::Mock {
        server
            .mock("POST", "/v1/auth/")
            .match_body(Matcher::Json(json!({"name": "key-id", "secret": "key-secret"})))
            .with_status(200)
            .with_body(json!({"payload": {"token": "jwt-token"}}).to_string())
            .create_async()
            .await
    }

    fn page(n: u32, size: u32) -> Matcher {
        Matcher::UrlEncoded("q".into(), format!("(page:{},page_size:{})", n, size))
    }

    #[tokio::test]
    async fn test_lists_every_page() {
        let mut server = Server::new_async().await;
        let _auth = mock_auth(&mut server).await;

        let _page0 = server
            .mock("GET", "/api/v1/dashboard/")
            .match_query(page(0, 2))
            .match_header("authorization", "Bearer jwt-token")
            .with_status(200)
            .with_body(
                json!({
                    "count": 3,
                    "result": [
                        {
                            "dashboard_title": "Churn Explorer",
                            "url": "/superset/dashboard/12/",
                            "changed_on_utc": "2025-05-20T08:00:00.000000+0000",
                            "owners": [
                                {"first_name": "Sang", "last_name": "Lu", "username": "slu"}
                            ],
                            "published": true
                        },
                        {
                            "dashboard_title": "Scratch",
                            "url": "https://elsewhere.example/d/13",
                            "changed_on": "2025-01-02 03:04:05",
                            "owners": [{"username": "bot"}],
                            "published": false
                        }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let _page1 = server
            .mock("GET", "/api/v1/dashboard/")
            .match_query(page(1, 2))
            .with_status(200)
            .with_body(
                json!({
                    "count": 3,
                    "result": [{"dashboard_title": "Signups", "url": "/superset/dashboard/14/"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let records = source(&server, 2).list_dashboards().await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].url, format!("{}/superset/dashboard/12/", server.url()));
        assert_eq!(records[0].owner.as_deref(), Some("Sang Lu"));
        assert_eq!(records[0].project_or_workspace.as_deref(), Some("127.0.0.1"));
        assert!(records[0].updated_at.is_some());
        assert_eq!(records[1].url, "https://elsewhere.example/d/13");
        assert_eq!(records[1].owner.as_deref(), Some("bot"));
        assert_eq!(records[1].published, Some(false));
        assert!(records[1].updated_at.is_some());
        assert_eq!(records[2].name, "Signups");
        assert!(records[2].owner.is_none());
    }

    #[tokio::test]
    async fn test_malformed_item_is_dropped() {
        let mut server = Server::new_async().await;
        let _auth = mock_auth(&mut server).await;
        let _page0 = server
            .mock("GET", "/api/v1/dashboard/")
            .match_query(page(0, 100))
            .with_status(200)
            .with_body(
                json!({
                    "count": 3,
                    "result": [
                        {"dashboard_title": "Good", "url": "/d/1/"},
                        {"dashboard_title": null, "url": "/d/2/"},
                        {"dashboard_title": "No link"}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let records = source(&server, 100).list_dashboards().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Good");
    }

    #[tokio::test]
    async fn test_auth_failure_is_unavailable() {
        let mut server = Server::new_async().await;
        let _auth = server
            .mock("POST", "/v1/auth/")
            .with_status(403)
            .with_body(json!({"error": "bad secret key-secret"}).to_string())
            .create_async()
            .await;

        match source(&server, 100).list_dashboards().await {
            Err(SourceError::Unavailable(reason)) => {
                assert!(reason.contains("403"));
                assert!(!reason.contains("key-secret"));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let source =
            PresetSource::new(reqwest::Client::new(), None, "http://unused".to_string(), 100);
        assert!(matches!(
            source.list_dashboards().await,
            Err(SourceError::CredentialsMissing)
        ));
    }

    #[test]
    fn test_workspace_label() {
        let label = |raw: &str| workspace_label(&base_url(raw).unwrap());
        assert_eq!(
            label("https://abc123.us1a.app.preset.io").as_deref(),
            Some("abc123.us1a.app.preset.io")
        );
        assert_eq!(label("http://127.0.0.1:4000").as_deref(), Some("127.0.0.1"));
        assert_eq!(label("http://[::1]:8088").as_deref(), Some("[::1]"));
        // userinfo never reaches the label
        assert_eq!(label("https://user:pw@ws.preset.io").as_deref(), Some("ws.preset.io"));
    }

    #[test]
    fn test_absolute_url_joins_relative_links() {
        let workspace = base_url("https://ws.preset.io/team").unwrap();
        assert_eq!(
            absolute_url(&workspace, "/superset/dashboard/7/"),
            "https://ws.preset.io/superset/dashboard/7/"
        );
        assert_eq!(
            absolute_url(&workspace, "https://other.example/d/1"),
            "https://other.example/d/1"
        );
        assert_eq!(absolute_url(&workspace, "  "), "");
    }
}
