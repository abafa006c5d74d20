use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

/// Liveness check. Settings were validated before the router was built.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "environment": state.config.environment,
        "config_validated": true
    }))
}

/// Readiness check: every provider must report itself configured.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let providers = state.predictor.providers();
    let mut failures = Vec::new();

    for provider in [&providers.openai, &providers.gemini] {
        if let Err(e) = provider.health_check().await {
            tracing::warn!(provider = provider.name(), error = %e, "Provider not ready");
            failures.push(json!({ "provider": provider.name(), "error": e.to_string() }));
        }
    }

    if failures.is_empty() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "providers": failures })),
        )
    }
}
