//! Text completion and word comparison payloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request body for `POST /api/v1/generate`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Optional provider selector; the default provider is used when absent.
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub response: String,
}

/// Request body for `POST /api/v1/compare`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ComparisonRequest {
    #[validate(length(min = 1, message = "word1 must not be empty"))]
    pub word1: String,
    #[validate(length(min = 1, message = "word2 must not be empty"))]
    pub word2: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResponse {
    /// Similarity score between 0 and 1.
    pub similarity: f64,
}
