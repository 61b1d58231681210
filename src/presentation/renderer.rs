// Static HTML rendering of the catalog
use crate::application::aggregator::SourceOutcome;
use crate::application::catalog_service::Catalog;
use crate::domain::dashboard::DashboardRecord;
use anyhow::Context;
use minijinja::{context, Environment, Value};
use serde::Serialize;

const TEMPLATE_NAME: &str = "catalog.html";
const TEMPLATE: &str = include_str!("../../templates/catalog.html");

#[derive(Debug, Serialize)]
struct SourceSummary {
    key: &'static str,
    name: &'static str,
    status: &'static str,
    count: usize,
    reason: Option<String>,
}

fn summarize(catalog: &Catalog) -> Vec<SourceSummary> {
    catalog
        .reports
        .iter()
        .map(|report| {
            let (status, count, reason) = match &report.outcome {
                SourceOutcome::Fetched { count } => ("fetched", *count, None),
                SourceOutcome::Skipped => ("skipped", 0, None),
                SourceOutcome::Unavailable { reason } => ("unavailable", 0, Some(reason.clone())),
            };
            SourceSummary {
                key: report.source.as_str(),
                name: report.source.display_name(),
                status,
                count,
                reason,
            }
        })
        .collect()
}

/// JSON for a `<script type="application/json">` block. Markup characters are
/// written as unicode escapes so record text cannot end the element.
fn embed_json(records: &[DashboardRecord]) -> anyhow::Result<String> {
    let json = serde_json::to_string(records).context("Failed to serialize records")?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026"))
}

pub fn render(catalog: &Catalog) -> anyhow::Result<String> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, TEMPLATE)?;

    let html = env.get_template(TEMPLATE_NAME)?.render(context! {
        generated_at => catalog.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        total => catalog.records.len(),
        sources => summarize(catalog),
        domains => catalog.domains.clone(),
        records_json => Value::from_safe_string(embed_json(&catalog.records)?),
    })?;

    Ok(html)
}
