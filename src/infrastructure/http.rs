// Shared plumbing for the platform REST clients
use crate::application::dashboard_source::SourceError;
use crate::domain::dashboard::{DashboardRecord, MalformedRecord, SourceKind};
use anyhow::Context;
use url::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Upper bound on pages walked per listing.
pub const MAX_PAGES: usize = 1000;

/// Credential material. Never printed.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// `None` for an absent or blank value.
    pub fn present(value: &Option<Secret>) -> Option<Secret> {
        value
            .as_ref()
            .filter(|s| !s.is_blank())
            .map(|s| Secret::new(s.0.trim()))
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

pub fn build_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

/// Map a transport failure. The request URL is stripped from the message.
pub fn send_error(context: &str, err: reqwest::Error) -> SourceError {
    let reason = if err.is_timeout() {
        format!("{} timed out", context)
    } else {
        format!("{} failed: {}", context, err.without_url())
    };
    SourceError::Unavailable(reason)
}

/// Check the status and decode the body. Bodies are never echoed into the
/// error since auth endpoints may reflect credentials.
pub async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, SourceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Unavailable(format!(
            "{} returned HTTP {}",
            context,
            status.as_u16()
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| {
            SourceError::Unavailable(format!(
                "{}: unreadable response: {}",
                context,
                e.without_url()
            ))
        })
}

/// Decode and normalize each raw item independently, dropping the ones that fail.
pub fn normalize_items<T, F>(
    kind: SourceKind,
    items: Vec<serde_json::Value>,
    mut normalize: F,
) -> Vec<DashboardRecord>
where
    T: DeserializeOwned,
    F: FnMut(T) -> Result<Option<DashboardRecord>, MalformedRecord>,
{
    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let decoded = serde_json::from_value::<T>(item)
            .map_err(|e| MalformedRecord::Undecodable(e.to_string()))
            .and_then(&mut normalize);
        match decoded {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => tracing::warn!(source = %kind, "dropping malformed dashboard: {}", e),
        }
    }
    records
}

/// Parse a configured platform URL. The path always ends in `/` so that
/// relative endpoints join beneath it instead of replacing its last segment.
pub fn base_url(raw: &str) -> Result<Url, url::ParseError> {
    let mut parsed = Url::parse(raw.trim())?;
    if parsed.cannot_be_a_base() || parsed.host_str().is_none() {
        return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase);
    }
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed)
}

/// Join a relative API path onto a base from [`base_url`].
pub fn endpoint(base: &Url, path: &str) -> Result<Url, SourceError> {
    base.join(path)
        .map_err(|e| SourceError::Unavailable(format!("invalid endpoint {:?}: {}", path, e)))
}
