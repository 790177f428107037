use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use tokio::time::timeout;

use crate::db_types::AppState;
use crate::dependency_engine::graph::DependencyGraphData;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct DependencyGraphParams {
    pub database: Option<String>,
    pub table: Option<String>,
    pub hops: Option<usize>,
}

/// `GET /api/dependency-graph?database=<db>[&table=<name>&hops=<n>]`
pub async fn get_dependency_graph(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<DependencyGraphParams>, QueryRejection>,
) -> Result<Json<DependencyGraphData>, ApiError> {
    let session = app_state.sessions.session(&headers).await;
    if !session.is_logged_in {
        return Err(ApiError::AuthRequired);
    }

    let executor = app_state.executor.clone().ok_or(ApiError::Config)?;

    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let database = params
        .database
        .as_deref()
        .map(str::trim)
        .filter(|db| !db.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required parameter: database".to_string()))?;

    log::info!(
        "Dependency graph requested for {} by {}",
        database,
        session.user.as_deref().unwrap_or("unknown")
    );

    let build = super::extractor::build_dependency_graph_clickhouse(
        executor.as_ref(),
        database,
        params.table.as_deref(),
        params.hops,
    );

    let graph = timeout(app_state.request_timeout, build)
        .await
        .map_err(|_| ApiError::Timeout(app_state.request_timeout.as_secs()))??;

    Ok(Json(graph.to_data()))
}
