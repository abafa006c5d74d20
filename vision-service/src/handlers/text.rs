use anyhow::Context;
use axum::{extract::State, Json};
use service_core::error::AppError;

use super::DEFAULT_MODEL;
use crate::models::{ComparisonRequest, ComparisonResponse, GenerateRequest, GenerateResponse};
use crate::utils::ValidatedJson;
use crate::AppState;

/// `POST /api/v1/generate`: free text completion.
pub async fn generate(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let model = request.model.as_deref().unwrap_or(DEFAULT_MODEL);
    let provider = state.predictor.provider_for(model)?;

    let response = provider
        .generate_text(&request.prompt)
        .await
        .map_err(|e| {
            tracing::error!(provider = provider.name(), error = %e, "Error generating text");
            e
        })
        .context("Error generating text")?;

    Ok(Json(GenerateResponse { response }))
}

/// `POST /api/v1/compare`: semantic similarity of two words.
pub async fn compare(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ComparisonRequest>,
) -> Result<Json<ComparisonResponse>, AppError> {
    let model = request.model.as_deref().unwrap_or(DEFAULT_MODEL);
    let provider = state.predictor.provider_for(model)?;

    let similarity = provider
        .compare_semantics(&request.word1, &request.word2)
        .await
        .map_err(|e| {
            tracing::error!(
                provider = provider.name(),
                word1 = %request.word1,
                word2 = %request.word2,
                error = %e,
                "Error comparing semantics"
            );
            e
        })
        .context("Error comparing semantics")?;

    tracing::debug!(similarity, "Compared words");
    Ok(Json(ComparisonResponse { similarity }))
}
