// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod databricks;
pub mod http;
pub mod preset;
pub mod tableau;
pub mod timestamps;
