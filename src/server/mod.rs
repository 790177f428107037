//! Axum server for the dependency graph API.

use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};

use crate::clickhouse::{ClickHouseHttpClient, QueryExecutor};
use crate::config::{Settings, SettingsError};
use crate::db_types::AppState;
use crate::dependency_engine::commands;
use crate::error::ApiError;
use crate::session::TokenSessions;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state for the handlers. A missing service account leaves
/// `executor` empty so graph requests report a configuration error.
pub fn build_state(settings: &Settings) -> Result<(AppState, Option<Arc<ClickHouseHttpClient>>), SettingsError> {
    let client = settings
        .clickhouse
        .connection_config()?
        .map(|config| Arc::new(ClickHouseHttpClient::new(config)));

    let state = AppState {
        executor: client
            .clone()
            .map(|client| client as Arc<dyn QueryExecutor>),
        sessions: Arc::new(TokenSessions::from_settings(&settings.auth)),
        request_timeout: settings.request_timeout(),
    };

    Ok((state, client))
}

/// Build the axum router with all routes
pub fn router(state: AppState, cors_allow_any: bool) -> Router {
    let router = Router::new()
        .route("/api/dependency-graph", get(commands::get_dependency_graph))
        .layer(CatchPanicLayer::custom(panic_response));

    let router = if cors_allow_any {
        let cors = CorsLayer::new()
            .allow_origin(AnyOrigin)
            .allow_methods(AnyOrigin)
            .allow_headers(AnyOrigin);
        router.layer(cors)
    } else {
        router
    };

    router.with_state(state)
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };

    ApiError::Internal(detail).into_response()
}

/// Start the web server
pub async fn serve(settings: Settings) -> Result<(), ServerError> {
    let (state, client) = build_state(&settings)?;

    match &client {
        Some(client) => match client.ping().await {
            Ok(()) => log::info!("ClickHouse reachable at {}", client.config().base_url()),
            Err(e) => log::warn!(
                "ClickHouse at {} is not reachable yet: {}",
                client.config().base_url(),
                e
            ),
        },
        None => log::warn!("ClickHouse service account is not configured; graph requests will fail"),
    }

    let app = router(state, settings.server.cors_allow_any);

    let addr = settings.server.listen.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    log::info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
