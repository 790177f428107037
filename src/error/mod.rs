//! Request-facing error taxonomy and the JSON error envelope.
//!
//! Client errors (auth, config, bad request) use HTTP status codes. Database
//! and internal failures are reported with HTTP 200 and `success: false`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::clickhouse::ClickHouseError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("ClickHouse service account is not configured")]
    Config,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Database(#[from] ClickHouseError),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Named(&'static str),
    Numeric(u32),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub user_message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
}

impl ApiError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::AuthRequired => ErrorCode::Named("AUTH_REQUIRED"),
            ApiError::Config => ErrorCode::Named("CONFIG_ERROR"),
            ApiError::BadRequest(_) => ErrorCode::Named("BAD_REQUEST"),
            ApiError::Database(err) => match err.code() {
                Some(code) => ErrorCode::Numeric(code),
                None => ErrorCode::Named("DATABASE_ERROR"),
            },
            ApiError::Timeout(_) => ErrorCode::Named("TIMEOUT"),
            ApiError::Internal(_) => ErrorCode::Named("INTERNAL_ERROR"),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthRequired => StatusCode::UNAUTHORIZED,
            ApiError::Config => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Timeout(_) | ApiError::Internal(_) => StatusCode::OK,
        }
    }

    pub fn error_type(&self) -> String {
        match self {
            ApiError::AuthRequired => "auth".to_string(),
            ApiError::Config => "config".to_string(),
            ApiError::BadRequest(_) => "validation".to_string(),
            ApiError::Database(err) => err.kind().to_string(),
            ApiError::Timeout(_) => "timeout".to_string(),
            ApiError::Internal(_) => "internal".to_string(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            ApiError::AuthRequired => "Please sign in to continue.".to_string(),
            ApiError::Config => "The server is not configured to access ClickHouse.".to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Database(err) => err.user_message(),
            ApiError::Timeout(_) => "The request took too long. Try again or narrow the scope.".to_string(),
            ApiError::Internal(_) => "Something went wrong while building the response.".to_string(),
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let message = match self {
            ApiError::Database(ClickHouseError::Server { message, .. }) => message.clone(),
            other => other.to_string(),
        };

        ErrorEnvelope {
            success: false,
            error: ErrorBody {
                code: self.code(),
                message,
                error_type: self.error_type(),
                user_message: self.user_message(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::AuthRequired | ApiError::BadRequest(_) => log::debug!("Rejected request: {}", self),
            _ => log::warn!("Request failed: {}", self),
        }

        (self.status(), Json(self.envelope())).into_response()
    }
}

#[cfg(test)]
mod tests;
