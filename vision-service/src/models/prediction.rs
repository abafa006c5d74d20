//! Batch image prediction request and response types.

use super::{ImageInput, SchemaError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Maximum number of images accepted in one request.
pub const MAX_BATCH_SIZE: usize = 10;

fn default_top_k() -> u32 {
    3
}

fn default_confidence_threshold() -> f64 {
    0.1
}

/// Request body for `POST /api/v1/predict`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PredictionRequest {
    /// Images to label, in order.
    #[validate(length(max = 10, message = "At most 10 images may be submitted per request"))]
    pub images: Vec<ImageInput>,

    /// Provider selector, e.g. "openai" or "gemini".
    pub model: String,

    /// Number of labels to return per image.
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 10, message = "top_k must be between 1 and 10"))]
    pub top_k: u32,

    /// Predictions below this confidence are dropped.
    #[serde(default = "default_confidence_threshold")]
    #[validate(range(
        min = 0.0,
        max = 1.0,
        message = "confidence_threshold must be between 0 and 1"
    ))]
    pub confidence_threshold: f64,
}

impl PredictionRequest {
    pub fn new(images: Vec<ImageInput>, model: impl Into<String>) -> Self {
        Self {
            images,
            model: model.into(),
            top_k: default_top_k(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

/// One label predicted for an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPredictionDetail")]
pub struct PredictionDetail {
    label: String,
    confidence: f64,
    reason: String,
}

#[derive(Deserialize)]
struct RawPredictionDetail {
    label: String,
    confidence: f64,
    reason: String,
}

impl TryFrom<RawPredictionDetail> for PredictionDetail {
    type Error = SchemaError;

    fn try_from(raw: RawPredictionDetail) -> Result<Self, Self::Error> {
        PredictionDetail::new(&raw.label, raw.confidence, raw.reason)
    }
}

impl PredictionDetail {
    /// Build a prediction; the label must be a single word and is stored
    /// lowercase.
    pub fn new(label: &str, confidence: f64, reason: impl Into<String>) -> Result<Self, SchemaError> {
        if label.is_empty() {
            return Err(SchemaError::EmptyLabel);
        }
        if label.chars().any(char::is_whitespace) {
            return Err(SchemaError::MultiWordLabel(label.to_string()));
        }

        Ok(Self {
            label: label.to_lowercase(),
            confidence,
            reason: reason.into(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Prediction results for a single image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePrediction {
    pub image_id: String,
    pub predictions: Vec<PredictionDetail>,
    pub processed_at: DateTime<Utc>,
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Success,
    Error,
}

/// Response body for `POST /api/v1/predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub request_id: String,
    pub status: PredictionStatus,
    pub model: String,
    pub top_k: u32,
    pub results: Vec<ImagePrediction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PredictionResponse {
    /// Successful response with a freshly generated request id.
    pub fn success(model: impl Into<String>, top_k: u32, results: Vec<ImagePrediction>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            status: PredictionStatus::Success,
            model: model.into(),
            top_k,
            results,
            error_message: None,
        }
    }
}
