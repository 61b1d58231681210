// Main entry point - Wiring and a single catalog build
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use crate::application::catalog_service::CatalogService;
use crate::application::dashboard_source::DashboardSource;
use crate::infrastructure::config::load_settings;
use crate::infrastructure::databricks::DatabricksSource;
use crate::infrastructure::http::build_client;
use crate::infrastructure::preset::PresetSource;
use crate::infrastructure::tableau::TableauSource;
use crate::presentation::renderer::render;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = load_settings()?;
    let client = build_client(settings.http_timeout())?;

    // Create sources (infrastructure layer), queried in this order
    let sources: Vec<Arc<dyn DashboardSource>> = vec![
        Arc::new(TableauSource::new(
            client.clone(),
            settings.tableau_credentials(),
            settings.tableau_api_version.clone(),
            settings.page_size,
        )),
        Arc::new(PresetSource::new(
            client.clone(),
            settings.preset_credentials(),
            settings.preset_auth_url.clone(),
            settings.page_size,
        )),
        Arc::new(DatabricksSource::new(
            client,
            settings.databricks_credentials(),
            settings.page_size,
        )),
    ];

    // Build the catalog (application layer)
    let service = CatalogService::new(
        sources,
        settings.classification.clone(),
        settings.curation.clone(),
    );
    let catalog = service.build(chrono::Utc::now()).await;

    // Render and write (presentation layer)
    let html = render(&catalog)?;
    tokio::fs::write(&settings.output_path, html)
        .await
        .with_context(|| format!("Failed to write {}", settings.output_path))?;

    tracing::info!(
        dashboards = catalog.records.len(),
        output = %settings.output_path,
        "catalog generated"
    );
    Ok(())
}
