use super::*;
use serde_json::json;

#[test]
fn test_status_mapping() {
    assert_eq!(ApiError::AuthRequired.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::Config.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
    assert_eq!(ApiError::Timeout(30).status(), StatusCode::OK);
    assert_eq!(ApiError::Internal("boom".into()).status(), StatusCode::OK);
}

#[test]
fn test_envelope_for_named_error() {
    let body = serde_json::to_value(ApiError::BadRequest("database parameter is required".into()).envelope()).unwrap();
    assert_eq!(
        body,
        json!({
            "success": false,
            "error": {
                "code": "BAD_REQUEST",
                "message": "Bad request: database parameter is required",
                "type": "validation",
                "userMessage": "database parameter is required"
            }
        })
    );
}

#[test]
fn test_envelope_passes_server_error_through() {
    let err = ApiError::from(ClickHouseError::Server {
        code: 60,
        message: "Table x.y does not exist.".into(),
        kind: "UNKNOWN_TABLE".into(),
    });
    assert_eq!(err.status(), StatusCode::OK);

    let body = serde_json::to_value(err.envelope()).unwrap();
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!(60));
    assert_eq!(body["error"]["message"], json!("Table x.y does not exist."));
    assert_eq!(body["error"]["type"], json!("UNKNOWN_TABLE"));
    assert_eq!(body["error"]["userMessage"], json!("The requested table does not exist."));
}

#[test]
fn test_envelope_for_transport_style_error() {
    let err = ApiError::from(ClickHouseError::Http {
        status: 503,
        body: "unavailable".into(),
    });
    assert_eq!(err.code(), ErrorCode::Named("DATABASE_ERROR"));
    assert_eq!(err.error_type(), "HTTP_ERROR");
}
