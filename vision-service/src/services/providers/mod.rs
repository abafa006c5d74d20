//! Vision/language provider abstractions and implementations.
//!
//! Each provider speaks a different wire format; the [`VisionProvider`] trait
//! gives the rest of the service one call shape for text completion, batch
//! image labelling and word similarity.

pub mod gemini;
pub mod mock;
pub mod openai;
pub mod reply;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use reply::{parse_prediction_reply, parse_similarity};

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered => "content_filtered",
            ProviderError::NetworkError(_) => "network_error",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Sampling parameters for a single provider call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// One image in a multimodal request, preceded by a text label.
#[derive(Debug, Clone)]
pub struct ImagePart {
    /// Text placed immediately before the image, e.g. `Image 1 (image_id: a):`.
    pub label: String,
    /// Base64-encoded image bytes.
    pub data: String,
    pub mime_type: String,
}

impl ImagePart {
    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// A single label as returned by a provider, before schema validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub reason: String,
}

/// Predictions for one image, keyed by the id the caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageLabels {
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub predictions: Vec<RawPrediction>,
}

/// Structured result of a batch labelling call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionOutput {
    pub images: Vec<ImageLabels>,
}

impl PredictionOutput {
    /// JSON schema of this type, used for structured output requests.
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "images": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "image_id": { "type": "string" },
                            "predictions": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": {
                                        "label": { "type": "string" },
                                        "confidence": { "type": "number" },
                                        "reason": { "type": "string" }
                                    },
                                    "required": ["label", "confidence", "reason"],
                                    "additionalProperties": false
                                }
                            }
                        },
                        "required": ["image_id", "predictions"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["images"],
            "additionalProperties": false
        })
    }
}

/// Provider selected by the `model` field of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
    OpenAi,
    Gemini,
}

impl ModelKind {
    /// Case-insensitive lookup of a known provider name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        if value == "gemini" || value.starts_with("gemini-") {
            Some(ModelKind::Gemini)
        } else if value == "openai" || value.starts_with("gpt") {
            Some(ModelKind::OpenAi)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::OpenAi => "openai",
            ModelKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt for [`VisionProvider::compare_semantics`].
pub fn similarity_prompt(word1: &str, word2: &str) -> String {
    format!(
        "On a scale from 0 to 1, rate the semantic similarity between '{word1}' and '{word2}'.\n\
         IMPORTANT: Respond with ONLY a number between 0 and 1.\n\
         Do not include any other text, explanation, or punctuation.\n\
         Examples:\n\
         - Identical words = 1.0\n\
         - Very similar words (car/automobile) = 0.95\n\
         - Completely different words (car/banana) = 0.1"
    )
}

/// Sampling used for similarity scoring: a handful of tokens, low temperature.
pub const SIMILARITY_PARAMS: GenerationParams = GenerationParams {
    max_tokens: 10,
    temperature: 0.3,
};

/// Trait for vision/language providers (e.g., OpenAI, Gemini).
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name for logging and metrics.
    fn name(&self) -> &str;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str;

    /// Defaults used by [`VisionProvider::generate_text`].
    fn default_params(&self) -> GenerationParams;

    /// Single-turn text completion.
    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, ProviderError>;

    /// Label a batch of images in one call.
    async fn predict_images(
        &self,
        system_instructions: &str,
        images: &[ImagePart],
        params: &GenerationParams,
    ) -> Result<PredictionOutput, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;

    /// Free text reply to `prompt` using the provider's default parameters.
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let params = self.default_params();
        let text = self.complete(prompt, &params).await?;
        if text.trim().is_empty() {
            return Err(ProviderError::InvalidResponse(
                "provider returned an empty reply".to_string(),
            ));
        }
        Ok(text)
    }

    /// Semantic similarity of two words in `[0, 1]`.
    async fn compare_semantics(&self, word1: &str, word2: &str) -> Result<f64, ProviderError> {
        let reply = self
            .complete(&similarity_prompt(word1, word2), &SIMILARITY_PARAMS)
            .await?;
        parse_similarity(&reply)
    }
}

/// The two configured providers.
#[derive(Clone)]
pub struct ProviderSet {
    pub openai: Arc<dyn VisionProvider>,
    pub gemini: Arc<dyn VisionProvider>,
}

impl ProviderSet {
    pub fn new(openai: Arc<dyn VisionProvider>, gemini: Arc<dyn VisionProvider>) -> Self {
        Self { openai, gemini }
    }

    pub fn get(&self, kind: ModelKind) -> &Arc<dyn VisionProvider> {
        match kind {
            ModelKind::OpenAi => &self.openai,
            ModelKind::Gemini => &self.gemini,
        }
    }
}
