// Application layer - Use cases over the dashboard sources
pub mod aggregator;
pub mod catalog_service;
pub mod dashboard_source;
