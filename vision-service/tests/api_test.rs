//! Router-level tests for the vision API, run against mock providers.

mod common;

use axum::http::StatusCode;
use common::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use vision_service::services::providers::mock::MockVisionProvider;
use vision_service::services::providers::{ProviderError, ProviderSet};

fn image(id: &str) -> serde_json::Value {
    json!({ "image_id": id, "base64_data": PNG_1X1, "format": "image/png" })
}

// ============================================================================
// Service endpoints
// ============================================================================

#[tokio::test]
async fn health_reports_validated_settings() {
    let response = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "test");
    assert_eq!(body["config_validated"], true);
}

#[tokio::test]
async fn ready_when_all_providers_configured() {
    let response = app().oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn not_ready_when_a_provider_is_unavailable() {
    let providers = ProviderSet::new(
        Arc::new(mock_provider("openai")),
        Arc::new(MockVisionProvider::disabled("gemini")),
    );
    let response = app_with(test_config(), providers)
        .oneshot(get("/ready"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = body_json(response).await;
    assert_eq!(body["providers"][0]["provider"], "gemini");
}

#[tokio::test]
async fn metrics_endpoint_serves_prometheus_text() {
    vision_service::services::init_metrics().unwrap();

    let app = app();
    app.clone()
        .oneshot(post_json(
            "/api/v1/compare",
            json!({ "word1": "car", "word2": "automobile" }),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let request = axum::http::Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn unknown_route_is_404() {
    let response = app().oneshot(get("/api/v1/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// POST /api/v1/predict
// ============================================================================

#[tokio::test]
async fn predict_rejects_empty_image_list() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/predict",
            json!({ "images": [], "model": "openai" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "No images provided in request");
}

#[tokio::test]
async fn predict_rejects_empty_image_data() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/predict",
            json!({
                "images": [
                    image("ok"),
                    { "image_id": "blank", "base64_data": "", "format": "image/png" }
                ],
                "model": "openai"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid image data provided");
}

#[tokio::test]
async fn predict_rejects_invalid_base64() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/predict",
            json!({
                "images": [{ "image_id": "a", "base64_data": "not base64!!", "format": "image/png" }],
                "model": "openai"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_rejects_unsupported_format() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/predict",
            json!({
                "images": [{ "image_id": "a", "base64_data": PNG_1X1, "format": "image/webp" }],
                "model": "openai"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_rejects_out_of_range_top_k() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/predict",
            json!({ "images": [image("a")], "model": "openai", "top_k": 11 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Validation error");
}

#[tokio::test]
async fn predict_rejects_oversized_batch() {
    let images: Vec<_> = (0..11).map(|i| image(&format!("img_{}", i))).collect();
    let response = app()
        .oneshot(post_json(
            "/api/v1/predict",
            json!({ "images": images, "model": "openai" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_rejects_malformed_json() {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/predict")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"images\": ["))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_routes_every_model_value() {
    for model in ["openai", "gemini", "Gemini", "some-unknown-model"] {
        let response = app()
            .oneshot(post_json(
                "/api/v1/predict",
                json!({
                    "images": [image("first"), image("second")],
                    "model": model,
                    "top_k": 2
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "model {}", model);

        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["model"], model);
        assert_eq!(body["top_k"], 2);
        assert!(body.get("error_message").is_none());

        let results = body["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["image_id"], "first");
        assert_eq!(results[1]["image_id"], "second");
        assert_eq!(results[0]["predictions"].as_array().unwrap().len(), 2);
    }
}

#[tokio::test]
async fn predict_accepts_duplicate_image_ids() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/predict",
            json!({ "images": [image("a"), image("a")], "model": "openai" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r["image_id"] == "a"));
}

#[tokio::test]
async fn predict_response_shape() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/predict",
            json!({ "images": [image("a")], "model": "openai" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert!(uuid::Uuid::parse_str(body["request_id"].as_str().unwrap()).is_ok());
    assert_eq!(body["top_k"], 3);

    let result = &body["results"][0];
    assert!(result["processed_at"].as_str().unwrap().ends_with('Z'));
    assert!(result["processing_time_ms"].as_f64().unwrap() >= 0.0);

    let first = &result["predictions"][0];
    assert_eq!(first["label"], "object");
    assert_eq!(first["confidence"], 0.9);
    assert!(first["reason"].is_string());
}

#[tokio::test]
async fn predict_applies_confidence_threshold() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/predict",
            json!({
                "images": [image("a")],
                "model": "gemini",
                "top_k": 3,
                "confidence_threshold": 0.5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let labels: Vec<_> = body["results"][0]["predictions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["label"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(labels, ["object", "shape"]);
}

#[tokio::test]
async fn predict_with_strict_selection_rejects_unknown_model() {
    let mut config = test_config();
    config.strict_model_selection = true;

    let response = app_with(config, mock_providers())
        .oneshot(post_json(
            "/api/v1/predict",
            json!({ "images": [image("a")], "model": "gemni" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn predict_provider_timeout_is_500() {
    let mut config = test_config();
    config.generation.provider_timeout_secs = 1;
    let providers = ProviderSet::new(
        Arc::new(mock_provider("openai").with_delay(Duration::from_secs(10))),
        Arc::new(mock_provider("gemini")),
    );

    let response = app_with(config, providers)
        .oneshot(post_json(
            "/api/v1/predict",
            json!({ "images": [image("a")], "model": "openai" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert!(body["details"].as_str().unwrap().contains("did not answer"));
}

#[tokio::test]
async fn predict_provider_failure_is_500() {
    let providers = ProviderSet::new(
        Arc::new(MockVisionProvider::disabled("openai")),
        Arc::new(mock_provider("gemini")),
    );

    let response = app_with(test_config(), providers)
        .oneshot(post_json(
            "/api/v1/predict",
            json!({ "images": [image("a")], "model": "openai" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ============================================================================
// POST /api/v1/compare
// ============================================================================

async fn similarity(word1: &str, word2: &str) -> f64 {
    let response = app()
        .oneshot(post_json(
            "/api/v1/compare",
            json!({ "word1": word1, "word2": word2 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["similarity"].as_f64().unwrap()
}

#[tokio::test]
async fn compare_similar_words_scores_high() {
    assert!(similarity("car", "automobile").await > 0.7);
}

#[tokio::test]
async fn compare_unrelated_words_scores_low() {
    assert!(similarity("car", "banana").await < 0.3);
}

#[tokio::test]
async fn compare_is_deterministic_and_bounded() {
    let first = similarity("tree", "forest").await;
    let second = similarity("tree", "forest").await;
    assert_eq!(first, second);
    assert!((0.0..=1.0).contains(&first));
}

#[tokio::test]
async fn compare_uses_requested_provider() {
    let gemini = Arc::new(mock_provider("gemini"));
    let providers = ProviderSet::new(Arc::new(mock_provider("openai")), gemini.clone());

    let response = app_with(test_config(), providers)
        .oneshot(post_json(
            "/api/v1/compare",
            json!({ "word1": "car", "word2": "automobile", "model": "gemini" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(gemini.calls(), 1);
}

#[tokio::test]
async fn compare_rejects_empty_word() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/compare",
            json!({ "word1": "", "word2": "car" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn compare_unparseable_reply_is_500() {
    let providers = ProviderSet::new(
        Arc::new(MockVisionProvider::new("openai").with_responder(|_| Ok("quite similar".into()))),
        Arc::new(mock_provider("gemini")),
    );

    let response = app_with(test_config(), providers)
        .oneshot(post_json(
            "/api/v1/compare",
            json!({ "word1": "car", "word2": "automobile" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert!(body["details"]
        .as_str()
        .unwrap()
        .starts_with("Error comparing semantics"));
}

// ============================================================================
// POST /api/v1/generate
// ============================================================================

#[tokio::test]
async fn generate_returns_provider_text() {
    let response = app()
        .oneshot(post_json(
            "/api/v1/generate",
            json!({ "prompt": "Describe a cat" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let text = body["response"].as_str().unwrap();
    assert!(!text.is_empty());
    assert!(text.contains("Describe a cat"));
}

#[tokio::test]
async fn generate_provider_failure_is_500() {
    let providers = ProviderSet::new(
        Arc::new(
            MockVisionProvider::new("openai").with_responder(|_| Err(ProviderError::RateLimited)),
        ),
        Arc::new(mock_provider("gemini")),
    );

    let response = app_with(test_config(), providers)
        .oneshot(post_json(
            "/api/v1/generate",
            json!({ "prompt": "hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["details"], "Error generating text: Rate limited");
}

#[tokio::test]
async fn generate_empty_reply_is_500() {
    let providers = ProviderSet::new(
        Arc::new(MockVisionProvider::new("openai").with_responder(|_| Ok("   ".into()))),
        Arc::new(mock_provider("gemini")),
    );

    let response = app_with(test_config(), providers)
        .oneshot(post_json(
            "/api/v1/generate",
            json!({ "prompt": "hello" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn generate_rejects_missing_prompt() {
    let response = app()
        .oneshot(post_json("/api/v1/generate", json!({ "model": "openai" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
