use super::*;

fn config(host: &str, secure: bool) -> ConnectionConfig {
    ConnectionConfig {
        host: host.to_string(),
        port: 8123,
        username: "monitor".to_string(),
        password: None,
        database: None,
        secure,
    }
}

#[test]
fn test_base_url_plain_host() {
    assert_eq!(config("localhost", false).base_url(), "http://localhost:8123");
}

#[test]
fn test_base_url_secure_host() {
    assert_eq!(config("ch.internal", true).base_url(), "https://ch.internal:8123");
}

#[test]
fn test_base_url_keeps_explicit_scheme() {
    assert_eq!(config("http://clickhouse.local/", true).base_url(), "http://clickhouse.local:8123");
    assert_eq!(config("https://clickhouse.local", false).base_url(), "https://clickhouse.local:8123");
}

#[test]
fn test_app_state_clone_shares_collaborators() {
    let state = AppState {
        executor: None,
        sessions: Arc::new(crate::session::TokenSessions::new(Default::default(), true)),
        request_timeout: Duration::from_secs(7),
    };

    let copy = state.clone();
    assert!(copy.executor.is_none());
    assert!(Arc::ptr_eq(&state.sessions, &copy.sessions));
    assert_eq!(copy.request_timeout, Duration::from_secs(7));
}
