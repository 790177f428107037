use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);

    if let Err(e) = chgraph_lib::run(config_path).await {
        log::error!("chgraph failed: {}", e);
        std::process::exit(1);
    }
}
