// =====================================================
// ClickHouse NATIVE HTTP OPERATIONS
// =====================================================

use crate::db_types::ConnectionConfig;
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

static EXCEPTION_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Code:\s*(\d+)").unwrap());
static EXCEPTION_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([A-Z][A-Z0-9_]+)\)").unwrap());

// --- Errors ---

#[derive(Debug, thiserror::Error)]
pub enum ClickHouseError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("ClickHouse error {code} ({kind}): {message}")]
    Server {
        code: u32,
        message: String,
        kind: String,
    },

    #[error("ClickHouse error (HTTP {status}): {body}")]
    Http { status: u16, body: String },

    #[error("Failed to decode ClickHouse response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("ClickHouse connection failed: {0}")]
    Native(#[from] ::clickhouse::error::Error),
}

impl ClickHouseError {
    /// Numeric server code, when ClickHouse reported one.
    pub fn code(&self) -> Option<u32> {
        match self {
            ClickHouseError::Server { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Classification used in the error envelope.
    pub fn kind(&self) -> &str {
        match self {
            ClickHouseError::Server { kind, .. } => kind,
            ClickHouseError::Transport(_) | ClickHouseError::Native(_) => "NETWORK_ERROR",
            ClickHouseError::Http { .. } => "HTTP_ERROR",
            ClickHouseError::Decode(_) => "DECODE_ERROR",
        }
    }

    /// Best-effort message suitable for showing to a dashboard user.
    pub fn user_message(&self) -> String {
        match self {
            ClickHouseError::Server { code, message, .. } => match code {
                60 => "The requested table does not exist.".to_string(),
                81 => "The requested database does not exist.".to_string(),
                159 => "The query took too long and was cancelled by ClickHouse.".to_string(),
                164 | 497 => "The monitoring account is not allowed to read this data.".to_string(),
                202 => "ClickHouse is handling too many queries right now. Try again shortly.".to_string(),
                241 => "ClickHouse ran out of memory while answering the request.".to_string(),
                394 => "The query was cancelled.".to_string(),
                516 => "ClickHouse rejected the monitoring account credentials.".to_string(),
                _ => message.clone(),
            },
            ClickHouseError::Transport(_) | ClickHouseError::Native(_) => {
                "Could not reach the ClickHouse server.".to_string()
            }
            ClickHouseError::Http { status, .. } => {
                format!("ClickHouse returned an unexpected HTTP status ({}).", status)
            }
            ClickHouseError::Decode(_) => "ClickHouse returned a response that could not be read.".to_string(),
        }
    }
}

/// Split a ClickHouse exception body such as
/// `Code: 60. DB::Exception: Table default.x does not exist. (UNKNOWN_TABLE) (version 24.3.1)`
/// into its code, message and type name.
pub fn parse_exception(body: &str, header_code: Option<u32>) -> Option<ClickHouseError> {
    let body = body.trim();
    let code = header_code.or_else(|| {
        EXCEPTION_CODE
            .captures(body)
            .and_then(|caps| caps[1].parse().ok())
    })?;

    let kind = EXCEPTION_TYPE
        .captures_iter(body)
        .last()
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string());

    let mut message = body
        .split_once("DB::Exception:")
        .map(|(_, rest)| rest)
        .unwrap_or(body);
    if let Some(idx) = message.find(&format!("({})", kind)) {
        message = &message[..idx];
    }
    if let Some(idx) = message.find("(version") {
        message = &message[..idx];
    }

    Some(ClickHouseError::Server {
        code,
        message: message.trim().to_string(),
        kind,
    })
}

// --- Query Results ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryStatistics {
    #[serde(default)]
    pub elapsed: f64,
    #[serde(default)]
    pub rows_read: u64,
    #[serde(default)]
    pub bytes_read: u64,
}

/// Body of a `FORMAT JSON` response, with `data` decoded into `T`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub rows: u64,
    #[serde(default)]
    pub statistics: Option<QueryStatistics>,
}

// --- Query Execution ---

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run `sql` with server-side bound parameters (`{name:Type}` placeholders).
    async fn query_json(
        &self,
        sql: &str,
        params: &[(&str, &str)],
    ) -> Result<QueryResponse<Value>, ClickHouseError>;
}

/// Run a query and decode each row of `data` into `T`.
pub async fn query<T: DeserializeOwned>(
    executor: &dyn QueryExecutor,
    sql: &str,
    params: &[(&str, &str)],
) -> Result<QueryResponse<T>, ClickHouseError> {
    let raw = executor.query_json(sql, params).await?;
    let data = raw
        .data
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()?;

    Ok(QueryResponse {
        data,
        rows: raw.rows,
        statistics: raw.statistics,
    })
}

fn with_json_format(sql: &str) -> String {
    let trimmed = sql.trim().trim_end_matches(';').trim_end();
    format!("{} FORMAT JSON", trimmed)
}

pub(crate) fn create_client(config: &ConnectionConfig) -> ::clickhouse::Client {
    let mut client = ::clickhouse::Client::default()
        .with_url(config.base_url())
        .with_user(&config.username);

    if let Some(pwd) = &config.password {
        client = client.with_password(pwd);
    }

    if let Some(db) = &config.database {
        if !db.is_empty() {
            client = client.with_database(db);
        }
    }

    client
}

/// Query client for the ClickHouse HTTP interface.
pub struct ClickHouseHttpClient {
    config: ConnectionConfig,
    http: reqwest::Client,
}

impl ClickHouseHttpClient {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Check the service account can reach the server by running `SELECT 1`.
    pub async fn ping(&self) -> Result<(), ClickHouseError> {
        let result: u8 = create_client(&self.config)
            .query("SELECT 1")
            .fetch_one()
            .await?;

        if result == 1 {
            Ok(())
        } else {
            Err(ClickHouseError::Http {
                status: 200,
                body: format!("unexpected ping result {}", result),
            })
        }
    }
}

#[async_trait]
impl QueryExecutor for ClickHouseHttpClient {
    async fn query_json(
        &self,
        sql: &str,
        params: &[(&str, &str)],
    ) -> Result<QueryResponse<Value>, ClickHouseError> {
        let body = with_json_format(sql);
        log::debug!("Executing ClickHouse query: {}", body);

        let mut request = self
            .http
            .post(self.config.base_url())
            .basic_auth(&self.config.username, self.config.password.as_deref())
            .query(&[("output_format_json_quote_64bit_integers", "0")]);

        if let Some(db) = &self.config.database {
            if !db.is_empty() {
                request = request.query(&[("database", db)]);
            }
        }

        for (name, value) in params {
            request = request.query(&[(format!("param_{}", name), *value)]);
        }

        let response = request.body(body).send().await?;
        let status = response.status();
        let header_code = response
            .headers()
            .get("X-ClickHouse-Exception-Code")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());
        let text = response.text().await?;

        if !status.is_success() {
            log::warn!("ClickHouse query failed with HTTP {}", status);
            return Err(parse_exception(&text, header_code).unwrap_or(ClickHouseError::Http {
                status: status.as_u16(),
                body: text,
            }));
        }

        Ok(serde_json::from_str(&text)?)
    }
}
