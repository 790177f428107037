use std::path::PathBuf;

pub mod clickhouse;
pub mod config;
pub mod db_types;
pub mod dependency_engine;
pub mod error;
pub mod server;
pub mod session;

/// Load settings and serve the API until the listener fails.
pub async fn run(config_path: Option<PathBuf>) -> Result<(), server::ServerError> {
    let settings = config::Settings::load(config_path)?;
    server::serve(settings).await
}
