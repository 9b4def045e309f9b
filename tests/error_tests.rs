// Error handling tests
// Author: kelexine (https://github.com/kelexine)

use axum::http::StatusCode;
use axum::response::IntoResponse;
use docsearch_cache::error::DocSearchError;

#[test]
fn test_error_display_messages() {
    let errors = vec![
        DocSearchError::Config("missing api key".to_string()),
        DocSearchError::SearchApi("HTTP 503".to_string()),
        DocSearchError::Timeout(30),
        DocSearchError::CacheStore("poisoned".to_string()),
        DocSearchError::InvalidRequest("page_size".to_string()),
        DocSearchError::UnknownTool("link_check".to_string()),
        DocSearchError::Internal("oops".to_string()),
    ];

    for error in errors {
        let display = format!("{}", error);
        assert!(!display.is_empty(), "Error should have display message");
    }
}

#[test]
fn test_timeout_message() {
    let error = DocSearchError::Timeout(30);
    assert!(error.to_string().contains("30s"));
    assert_eq!(error.kind(), "timeout_error");
}

#[test]
fn test_status_codes() {
    let cases = vec![
        (DocSearchError::InvalidRequest("bad".to_string()), StatusCode::BAD_REQUEST),
        (DocSearchError::UnknownTool("x".to_string()), StatusCode::NOT_FOUND),
        (DocSearchError::SearchApi("down".to_string()), StatusCode::BAD_GATEWAY),
        (DocSearchError::Timeout(30), StatusCode::GATEWAY_TIMEOUT),
        (DocSearchError::CacheStore("gone".to_string()), StatusCode::SERVICE_UNAVAILABLE),
        (DocSearchError::Config("missing".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, status) in cases {
        assert_eq!(error.into_response().status(), status);
    }
}

#[tokio::test]
async fn test_error_body_shape() {
    let response = DocSearchError::UnknownTool("link_check".to_string()).into_response();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["type"], "error");
    assert_eq!(body["error"]["type"], "not_found_error");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("link_check"));
}

#[test]
fn test_json_errors_convert() {
    let err: DocSearchError = serde_json::from_str::<serde_json::Value>("{")
        .unwrap_err()
        .into();
    assert_eq!(err.kind(), "invalid_request_error");
}
