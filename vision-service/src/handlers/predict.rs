use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::models::{PredictionRequest, PredictionResponse};
use crate::utils::ValidatedJson;
use crate::AppState;

/// `POST /api/v1/predict`: label a batch of images.
pub async fn predict(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<PredictionRequest>,
) -> Result<Json<PredictionResponse>, AppError> {
    if request.images.is_empty() {
        tracing::warn!("Prediction request without images");
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "No images provided in request"
        )));
    }

    if request.images.iter().any(|image| image.is_empty()) {
        tracing::warn!("Prediction request with empty image data");
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Invalid image data provided"
        )));
    }

    tracing::info!(
        model = %request.model,
        images = request.images.len(),
        top_k = request.top_k,
        "Processing prediction request"
    );

    let response = state.predictor.predict_images(&request).await?;
    Ok(Json(response))
}
