//! HTTP contract tests for the Gemini provider against a local mock server.

use std::time::Duration;

use httpmock::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

use opticast_core::config::OptiCastConfig;
use opticast_core::credentials::{InMemoryCredentialStore, resolve_credential};
use opticast_core::error::{FailureKind, ProjectionError};
use opticast_core::inputs::{Category, InputSet};
use opticast_core::ProjectionClient;

const MODEL_PATH: &str = "/models/gemini-1.5-flash:generateContent";

fn config_for(server: &MockServer) -> OptiCastConfig {
    let mut config = OptiCastConfig::default();
    config.service.base_url = Some(server.base_url());
    config.service.timeout_secs = 1;
    config
}

fn inputs() -> InputSet {
    InputSet::new(250_000.0, 180_000.0, 85_000.0, 120_000.0, 60_000.0).unwrap()
}

fn projection_text() -> String {
    json!({
        "analysis": "Power tariffs lead the increase.",
        "records": [
            {"category": "Contractors", "amount_prior": 250000, "amount_projected": 253750},
            {"category": "Labor", "amount_prior": 180000, "amount_projected": 187560},
            {"category": "Fuel", "amount_prior": 85000, "amount_projected": 89250},
            {"category": "Power", "amount_prior": 120000, "amount_projected": 127200},
            {"category": "Maintenance", "amount_prior": 60000, "amount_projected": 76525}
        ],
        "kpis": {"total_prior": 695000, "total_projected": 734285, "variation_percent": 5.65}
    })
    .to_string()
}

fn gemini_envelope(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "modelVersion": "gemini-1.5-flash-002"
    })
}

#[tokio::test]
async fn successful_projection_round_trip() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(MODEL_PATH)
                .query_param("key", "test-key")
                .header("content-type", "application/json")
                .body_includes("\"responseMimeType\":\"application/json\"")
                .body_includes("\\\"Contractors\\\": 250000");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(gemini_envelope(&projection_text()));
        })
        .await;

    let client = ProjectionClient::connect(&config_for(&server), "test-key").unwrap();
    let result = client.project(&inputs()).await.unwrap();

    mock.assert_calls_async(1).await;
    assert_eq!(result.kpis().total_projected, 734_285.0);
    assert_eq!(
        result.record(Category::Maintenance).unwrap().amount_projected,
        76_525.0
    );
    assert!(result.consistency_warnings().is_empty());
}

#[tokio::test]
async fn empty_credential_makes_no_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200)
                .json_body(gemini_envelope(&projection_text()));
        })
        .await;
    let config = config_for(&server);

    let err = ProjectionClient::connect(&config, "").err().unwrap();
    assert_eq!(err.kind(), FailureKind::Configuration);

    let mut service = config.service.clone();
    service.api_key_env = "OPTICAST_TEST_UNSET_GEMINI_KEY".to_string();
    let err = resolve_credential(&service, &InMemoryCredentialStore::new(), Some("   "))
        .unwrap_err();
    assert!(matches!(err, ProjectionError::MissingCredential { .. }));

    mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn rejected_key_maps_to_auth_error() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(403).json_body(json!({"error": {
                "code": 403,
                "message": "API key not valid. Please pass a valid API key."
            }}));
        })
        .await;

    let client = ProjectionClient::connect(&config_for(&server), "bad-key").unwrap();
    let err = client.project(&inputs()).await.unwrap_err();

    mock.assert_calls_async(1).await;
    assert!(matches!(err, ProjectionError::AuthRejected { status: 403, .. }));
    assert_eq!(err.kind(), FailureKind::Transport);
    assert!(err.to_string().contains("API key not valid"), "{err}");
}

#[tokio::test]
async fn invalid_key_reported_as_bad_request_is_an_auth_error() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(400).json_body(json!({"error": {
                "code": 400,
                "message": "API key not valid. Please pass a valid API key.",
                "status": "INVALID_ARGUMENT",
                "details": [{
                    "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                    "reason": "API_KEY_INVALID"
                }]
            }}));
        })
        .await;

    let client = ProjectionClient::connect(&config_for(&server), "bad-key").unwrap();
    let err = client.project(&inputs()).await.unwrap_err();

    mock.assert_calls_async(1).await;
    match err {
        ProjectionError::AuthRejected { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "API key not valid. Please pass a valid API key.");
        }
        other => panic!("expected AuthRejected, got {other:?}"),
    }
}

#[tokio::test]
async fn quota_exhaustion_is_not_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(429)
                .json_body(json!({"error": {"code": 429, "message": "Resource has been exhausted"}}));
        })
        .await;

    let client = ProjectionClient::connect(&config_for(&server), "k").unwrap();
    let err = client.project(&inputs()).await.unwrap_err();

    mock.assert_calls_async(1).await;
    match err {
        ProjectionError::QuotaExceeded { message } => {
            assert_eq!(message, "Resource has been exhausted")
        }
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_model_maps_to_service_unavailable() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(404)
                .json_body(json!({"error": {"code": 404, "message": "models/gemini-1.5-flash is not found"}}));
        })
        .await;

    let client = ProjectionClient::connect(&config_for(&server), "k").unwrap();
    let err = client.project(&inputs()).await.unwrap_err();
    assert!(matches!(
        err,
        ProjectionError::ServiceUnavailable { status: 404, .. }
    ));
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200)
                .delay(Duration::from_secs(3))
                .json_body(gemini_envelope(&projection_text()));
        })
        .await;

    let client = ProjectionClient::connect(&config_for(&server), "k").unwrap();
    let err = client.project(&inputs()).await.unwrap_err();
    assert!(matches!(err, ProjectionError::Timeout { timeout_secs: 1 }));
}

#[tokio::test]
async fn non_json_reply_is_a_parse_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200)
                .json_body(gemini_envelope("I could not produce a projection."));
        })
        .await;

    let client = ProjectionClient::connect(&config_for(&server), "k").unwrap();
    let err = client.project(&inputs()).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Parse);
    match err {
        ProjectionError::MalformedResponse { preview, .. } => {
            assert!(preview.starts_with("I could not"))
        }
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn safety_blocked_prompt_is_a_parse_failure() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(MODEL_PATH);
            then.status(200)
                .json_body(json!({"promptFeedback": {"blockReason": "SAFETY"}}));
        })
        .await;

    let client = ProjectionClient::connect(&config_for(&server), "k").unwrap();
    let err = client.project(&inputs()).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Parse);
}
