// Tableau REST API source (personal access token exchanged for a session token)
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

const AUTH_HEADER: &str = "x-tableau-auth";

#[derive(Debug, Clone)]
pub struct TableauCredentials {
    pub server_url: Url,
    pub site_id: String,
    pub token_name: String,
    pub token_value: Secret,
}

#[derive(Debug, Clone)]
pub struct TableauSource {
    client: reqwest::Client,
    credentials: Option<TableauCredentials>,
    api_version: String,
    page_size: u32,
}

struct Session {
    token: Secret,
    site_luid: String,
}

#[derive(Debug, Deserialize)]
struct SignInResponse {
    credentials: SignInCredentials,
}

#[derive(Debug, Deserialize)]
struct SignInCredentials {
    token: String,
    site: SiteRef,
}

#[derive(Debug, Deserialize)]
struct SiteRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WorkbooksPage {
    #[serde(default)]
    pagination: Option<Pagination>,
    #[serde(default)]
    workbooks: WorkbookList,
}

#[derive(Debug, Default, Deserialize)]
struct WorkbookList {
    #[serde(default)]
    workbook: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    total_available: Value,
}

impl Pagination {
    // The JSON flavour of the API reports counts as strings
    fn total(&self) -> usize {
        match &self.total_available {
            Value::String(s) => s.parse().unwrap_or(0),
            Value::Number(n) => n.as_u64().unwrap_or(0) as usize,
            _ => 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Workbook {
    name: String,
    #[serde(default)]
    webpage_url: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
    #[serde(default)]
    project: Option<NamedRef>,
    #[serde(default)]
    owner: Option<NamedRef>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: Option<String>,
}

impl TableauSource {
    pub fn new(
        client: reqwest::Client,
        credentials: Option<TableauCredentials>,
        api_version: String,
        page_size: u32,
    ) -> Self {
        Self {
            client,
            credentials,
            api_version,
            page_size,
        }
    }

    fn api_url(&self, creds: &TableauCredentials, path: &str) -> Result<Url, SourceError> {
        endpoint(&creds.server_url, &format!("api/{}/{}", self.api_version, path))
    }

    async fn sign_in(&self, creds: &TableauCredentials) -> Result<Session, SourceError> {
        let body = json!({
            "credentials": {
                "personalAccessTokenName": creds.token_name,
                "personalAccessTokenSecret": creds.token_value.expose(),
                "site": { "contentUrl": creds.site_id },
            }
        });

        let response = self
            .client
            .post(self.api_url(creds, "auth/signin")?)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| send_error("Tableau sign-in", e))?;

        let signed_in: SignInResponse = read_json(response, "Tableau sign-in").await?;
        Ok(Session {
            token: Secret::new(signed_in.credentials.token),
            site_luid: signed_in.credentials.site.id,
        })
    }

    async fn sign_out(&self, creds: &TableauCredentials, session: &Session) {
        let Ok(url) = self.api_url(creds, "auth/signout") else {
            return;
        };
        let result = self
            .client
            .post(url)
            .header(AUTH_HEADER, session.token.expose())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::debug!("Tableau sign-out returned HTTP {}", response.status().as_u16())
            }
            Err(e) => tracing::debug!("Tableau sign-out failed: {}", e.without_url()),
        }
    }

    async fn list_workbooks(
        &self,
        creds: &TableauCredentials,
        session: &Session,
    ) -> Result<Vec<Value>, SourceError> {
        let site = urlencoding::encode(&session.site_luid);
        let url = self.api_url(creds, &format!("sites/{}/workbooks", site))?;
        let mut items = Vec::new();

        for page_number in 1..=MAX_PAGES {
            let response = self
                .client
                .get(url.clone())
                .header(AUTH_HEADER, session.token.expose())
                .header("Accept", "application/json")
                .query(&[
                    ("pageSize", self.page_size.to_string()),
                    ("pageNumber", page_number.to_string()),
                ])
                .send()
                .await
                .map_err(|e| send_error("Tableau workbook listing", e))?;

            let page: WorkbooksPage = read_json(response, "Tableau workbook listing").await?;
            let total = page.pagination.as_ref().map(Pagination::total).unwrap_or(0);
            let fetched = page.workbooks.workbook.len();
            items.extend(page.workbooks.workbook);

            tracing::debug!(page = page_number, fetched, total, "tableau workbooks page");
            if fetched == 0 || items.len() >= total {
                return Ok(items);
            }
        }

        tracing::warn!("Tableau listing stopped after {} pages", MAX_PAGES);
        Ok(items)
    }
}

fn normalize(workbook: Workbook) -> Result<Option<DashboardRecord>, MalformedRecord> {
    let record = DashboardRecord::new(SourceKind::Tableau, &workbook.name, &workbook.webpage_url)?
        .with_project(workbook.project.and_then(|p| p.name))
        .with_owner(workbook.owner.and_then(|o| o.name))
        .with_description(workbook.description)
        .with_updated_at(parse_optional(workbook.updated_at.as_deref()));
    Ok(Some(record))
}

#[async_trait]
impl DashboardSource for TableauSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Tableau
    }

    async fn list_dashboards(&self) -> Result<Vec<DashboardRecord>, SourceError> {
        let creds = self.credentials.as_ref().ok_or(SourceError::CredentialsMissing)?;

        let session = self.sign_in(creds).await?;
        let listed = self.list_workbooks(creds, &session).await;
        self.sign_out(creds, &session).await;

        Ok(normalize_items(SourceKind::Tableau, listed?, normalize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::http::base_url;
    use mockito::{Matcher, Server};

    fn credentials(server: &Server) -> TableauCredentials {
        TableauCredentials {
            server_url: base_url(&format!("{}/", server.url())).unwrap(),
            site_id: "analytics".to_string(),
            token_name: "catalog".to_string(),
            token_value: Secret::new("pat-secret-value"),
        }
    }

    fn source(server: &Server) -> TableauSource {
        TableauSource::new(
            reqwest::Client::new(),
            Some(credentials(server)),
            "3.21".to_string(),
            2,
        )
    }

    async fn mock_sign_in(server: &mut Server) -> mockito::Mock {
        server
            .mock("POST", "/api/3.21/auth/signin")
            .match_body(Matcher::PartialJson(json!({
                "credentials": {
                    "personalAccessTokenName": "catalog",
                    "personalAccessTokenSecret": "pat-secret-value",
                    "site": { "contentUrl": "analytics" }
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"credentials": {"token": "session-token", "site": {"id": "site-luid"}}})
                    .to_string(),
            )
            .create_async()
            .await
    }

    async fn mock_sign_out(server: &mut Server) -> mockito::Mock {
        server
            .mock("POST", "/api/3.21/auth/signout")
            .match_header(AUTH_HEADER, "session-token")
            .with_status(204)
            .expect(1)
            .create_async()
            .await
    }

    fn page_query(page: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("pageSize".into(), "2".into()),
            Matcher::UrlEncoded("pageNumber".into(), page.into()),
        ])
    }

    #[tokio::test]
    async fn test_lists_every_page_and_signs_out() {
        let mut server = Server::new_async().await;
        let _signin = mock_sign_in(&mut server).await;
        let signout = mock_sign_out(&mut server).await;

        let _page1 = server
            .mock("GET", "/api/3.21/sites/site-luid/workbooks")
            .match_query(page_query("1"))
            .match_header(AUTH_HEADER, "session-token")
            .with_status(200)
            .with_body(
                json!({
                    "pagination": {"pageNumber": "1", "pageSize": "2", "totalAvailable": "4"},
                    "workbooks": {"workbook": [
                        {
                            "name": "Revenue Overview",
                            "webpageUrl": "https://tableau.example/#/workbooks/1",
                            "updatedAt": "2025-05-30T10:00:00Z",
                            "project": {"id": "p1", "name": "Finance"},
                            "owner": {"id": "u1", "name": "jane@example.com"},
                            "description": "Monthly revenue"
                        },
                        {
                            "name": "Playback Health",
                            "webpageUrl": "https://tableau.example/#/workbooks/2"
                        }
                    ]}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let _page2 = server
            .mock("GET", "/api/3.21/sites/site-luid/workbooks")
            .match_query(page_query("2"))
            .with_status(200)
            .with_body(
                json!({
                    "pagination": {"pageNumber": "2", "pageSize": "2", "totalAvailable": "4"},
                    "workbooks": {"workbook": [
                        {"webpageUrl": "https://tableau.example/#/workbooks/3"},
                        {"name": "Ad Yield", "webpageUrl": "https://tableau.example/#/workbooks/4"}
                    ]}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let records = source(&server).list_dashboards().await.unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Revenue Overview", "Playback Health", "Ad Yield"]);
        let first = &records[0];
        assert_eq!(first.source, SourceKind::Tableau);
        assert_eq!(first.project_or_workspace.as_deref(), Some("Finance"));
        assert_eq!(first.owner.as_deref(), Some("jane@example.com"));
        assert_eq!(first.description.as_deref(), Some("Monthly revenue"));
        assert!(first.updated_at.is_some());
        assert!(records[1].updated_at.is_none());
        signout.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_site() {
        let mut server = Server::new_async().await;
        let _signin = mock_sign_in(&mut server).await;
        let _signout = mock_sign_out(&mut server).await;
        let _page = server
            .mock("GET", "/api/3.21/sites/site-luid/workbooks")
            .match_query(page_query("1"))
            .with_status(200)
            .with_body(json!({"pagination": {"totalAvailable": "0"}, "workbooks": {}}).to_string())
            .create_async()
            .await;

        let records = source(&server).list_dashboards().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_sign_in_does_not_leak_token() {
        let mut server = Server::new_async().await;
        let _signin = server
            .mock("POST", "/api/3.21/auth/signin")
            .with_status(401)
            .with_body("invalid token pat-secret-value")
            .create_async()
            .await;

        let err = source(&server).list_dashboards().await.unwrap_err();
        match err {
            SourceError::Unavailable(reason) => {
                assert!(reason.contains("401"));
                assert!(!reason.contains("pat-secret-value"));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_listing_failure_still_signs_out() {
        let mut server = Server::new_async().await;
        let _signin = mock_sign_in(&mut server).await;
        let signout = mock_sign_out(&mut server).await;
        let _page = server
            .mock("GET", "/api/3.21/sites/site-luid/workbooks")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let err = source(&server).list_dashboards().await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
        signout.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_without_request() {
        let source = TableauSource::new(reqwest::Client::new(), None, "3.21".to_string(), 100);
        assert!(matches!(
            source.list_dashboards().await,
            Err(SourceError::CredentialsMissing)
        ));
    }
}
