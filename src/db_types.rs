// =====================================================
// COMMON DATABASE TYPES AND STRUCTURES
// =====================================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::clickhouse::QueryExecutor;
use crate::session::SessionProvider;

// --- State Management ---
#[derive(Clone)]
pub struct AppState {
    /// `None` when the service account is not configured.
    pub executor: Option<Arc<dyn QueryExecutor>>,
    pub sessions: Arc<dyn SessionProvider>,
    pub request_timeout: Duration,
}

// --- Connection Configuration ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub database: Option<String>,
    #[serde(default)]
    pub secure: bool,
}

impl ConnectionConfig {
    /// Base URL of the ClickHouse HTTP interface. A host that already carries a
    /// scheme is used as-is.
    pub fn base_url(&self) -> String {
        let host = self.host.trim().trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            return format!("{}:{}", host, self.port);
        }

        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, host, self.port)
    }
}

#[cfg(test)]
mod tests;
