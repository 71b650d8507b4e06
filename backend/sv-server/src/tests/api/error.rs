use crate::ApiError;

use std::panic::Location;

use axum::response::IntoResponse;
use error_location::ErrorLocation;
use http::StatusCode;
use http_body_util::BodyExt;
use sv_supervisor::{LaunchSpec, Registry, WorkerDefinition};

async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
    let response = error.into_response();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_not_found_returns_404_with_json_body() {
    let (status, json) = body_json(ApiError::not_found("No worker on port 9999")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
    assert_eq!(json["error"]["message"], "No worker on port 9999");
}

#[tokio::test]
async fn test_bad_request_returns_400() {
    let (status, json) = body_json(ApiError::bad_request("Invalid port 'abc'")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_internal_error_returns_500() {
    let error = ApiError::Internal {
        message: "Worker operation did not complete".into(),
        location: ErrorLocation::from(Location::caller()),
    };

    let (status, json) = body_json(error).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
}

#[test]
fn test_duplicate_port_maps_to_internal() {
    let definitions = vec![
        WorkerDefinition::new("a", 8001, LaunchSpec::new("a")),
        WorkerDefinition::new("b", 8001, LaunchSpec::new("b")),
    ];
    let supervisor_error = Registry::new(definitions).unwrap_err();

    let error = ApiError::from(supervisor_error);

    assert!(matches!(error, ApiError::Internal { .. }));
}
