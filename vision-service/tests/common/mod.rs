//! Shared helpers for vision-service integration tests.

#![allow(dead_code)]

use axum::{body::Body, http::Request, response::Response, Router};
use http_body_util::BodyExt;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use vision_service::config::{GenerationDefaults, ProviderConfig, VisionConfig};
use vision_service::services::providers::mock::MockVisionProvider;
use vision_service::services::providers::{ProviderError, ProviderSet};
use vision_service::startup::build_router;
use vision_service::AppState;

/// 1x1 transparent PNG.
pub const PNG_1X1: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

pub fn test_config() -> VisionConfig {
    VisionConfig {
        common: CoreConfig::default(),
        environment: "test".to_string(),
        openai: ProviderConfig {
            api_key: "test-openai-key".to_string(),
            model: "gpt-4o-2024-08-06".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
        },
        gemini: ProviderConfig {
            api_key: "test-gemini-key".to_string(),
            model: "gemini-2.0-flash".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
        },
        generation: GenerationDefaults {
            max_tokens: 1000,
            temperature: 0.8,
            provider_timeout_secs: 5,
        },
        strict_model_selection: false,
    }
}

/// Deterministic similarity scores keyed on the words in the prompt.
pub fn similarity_responder(prompt: &str) -> Result<String, ProviderError> {
    let score = if prompt.contains("'car' and 'automobile'") {
        "0.95"
    } else if prompt.contains("'car' and 'banana'") {
        "0.1"
    } else {
        "0.5"
    };
    Ok(score.to_string())
}

pub fn mock_provider(name: &'static str) -> MockVisionProvider {
    MockVisionProvider::new(name).with_responder(|prompt| {
        if prompt.contains("semantic similarity") {
            similarity_responder(prompt)
        } else {
            Ok(format!("Generated reply to: {}", prompt))
        }
    })
}

pub fn mock_providers() -> ProviderSet {
    ProviderSet::new(
        Arc::new(mock_provider("openai")),
        Arc::new(mock_provider("gemini")),
    )
}

pub fn app_with(config: VisionConfig, providers: ProviderSet) -> Router {
    build_router(AppState::new(config, providers))
}

pub fn app() -> Router {
    app_with(test_config(), mock_providers())
}

pub fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
