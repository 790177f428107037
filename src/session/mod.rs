// =====================================================
// SESSION / AUTHENTICATION
// =====================================================

use async_trait::async_trait;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use serde::Serialize;
use std::collections::HashMap;

use crate::config::AuthSettings;

const SESSION_COOKIE: &str = "session";
const ANONYMOUS_USER: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub is_logged_in: bool,
    pub user: Option<String>,
}

impl Session {
    pub fn logged_out() -> Self {
        Self {
            is_logged_in: false,
            user: None,
        }
    }

    pub fn for_user(user: impl Into<String>) -> Self {
        Self {
            is_logged_in: true,
            user: Some(user.into()),
        }
    }
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session(&self, headers: &HeaderMap) -> Session;
}

/// Sessions backed by a static token -> user map from the settings file.
pub struct TokenSessions {
    tokens: HashMap<String, String>,
    allow_anonymous: bool,
}

impl TokenSessions {
    pub fn new(tokens: HashMap<String, String>, allow_anonymous: bool) -> Self {
        Self {
            tokens,
            allow_anonymous,
        }
    }

    pub fn from_settings(auth: &AuthSettings) -> Self {
        Self::new(auth.tokens.clone(), auth.allow_anonymous)
    }
}

#[async_trait]
impl SessionProvider for TokenSessions {
    async fn session(&self, headers: &HeaderMap) -> Session {
        if self.allow_anonymous {
            return Session::for_user(ANONYMOUS_USER);
        }

        match session_token(headers).and_then(|token| self.tokens.get(&token)) {
            Some(user) => Session::for_user(user.clone()),
            None => Session::logged_out(),
        }
    }
}

/// Token from `Authorization: Bearer <token>`, falling back to the session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|token| !token.is_empty())
}
