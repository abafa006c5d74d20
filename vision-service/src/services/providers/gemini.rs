//! Gemini provider implementation.
//!
//! Uses Google's `generateContent` API with images as inline data parts.
//! Batch labelling is requested as free text with an explicit JSON format
//! instruction and parsed with [`parse_prediction_reply`].

use super::{
    parse_prediction_reply, GenerationParams, ImagePart, PredictionOutput, ProviderError,
    VisionProvider,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Appended to the system instructions so the free-text reply can be parsed.
const FORMAT_INSTRUCTION: &str = "Respond with only a JSON object, without Markdown or any other text, \
of the form {\"images\": [{\"image_id\": \"<image_id>\", \"predictions\": \
[{\"label\": \"<single word>\", \"confidence\": <number between 0 and 1>, \"reason\": \"<brief reason>\"}]}]}.";

/// Gemini provider configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub base_url: String,
    pub defaults: GenerationParams,
    pub timeout: Duration,
}

/// Gemini vision provider.
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Build the API URL for the given model and method.
    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            method,
            self.config.api_key
        )
    }

    /// Build generation config from parameters.
    fn build_generation_config(&self, params: &GenerationParams) -> GenerationConfig {
        GenerationConfig {
            temperature: Some(params.temperature),
            max_output_tokens: Some(params.max_tokens),
        }
    }

    /// Send a `generateContent` request and return the concatenated reply text.
    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<String, ProviderError> {
        let url = self.api_url("generateContent");

        tracing::debug!(
            model = %self.config.model,
            parts = request.contents.iter().map(|c| c.parts.len()).sum::<usize>(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        if let Some(feedback) = &api_response.prompt_feedback {
            if feedback.block_reason.is_some() {
                return Err(ProviderError::ContentFiltered);
            }
        }

        let candidate = api_response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("response has no candidates".to_string()))?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ProviderError::ContentFiltered);
        }

        if let Some(usage) = api_response.usage_metadata {
            tracing::info!(
                model = %self.config.model,
                prompt_tokens = usage.prompt_token_count.unwrap_or(0),
                candidates_tokens = usage.candidates_token_count.unwrap_or(0),
                finish_reason = ?candidate.finish_reason,
                "Received response from Gemini"
            );
        }

        let text: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| match part {
                        ContentPart::Text { text } => Some(text),
                        ContentPart::InlineData { .. } => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(text)
    }
}

#[async_trait]
impl VisionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn default_params(&self) -> GenerationParams {
        self.config.defaults
    }

    async fn complete(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        let request = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![ContentPart::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(self.build_generation_config(params)),
        };

        Ok(self.generate_content(&request).await?.trim().to_string())
    }

    async fn predict_images(
        &self,
        system_instructions: &str,
        images: &[ImagePart],
        params: &GenerationParams,
    ) -> Result<PredictionOutput, ProviderError> {
        let mut parts = Vec::with_capacity(images.len() * 2);
        for image in images {
            parts.push(ContentPart::Text {
                text: image.label.clone(),
            });
            parts.push(ContentPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
            });
        }

        let request = GenerateContentRequest {
            system_instruction: Some(Content {
                role: None,
                parts: vec![ContentPart::Text {
                    text: format!("{}\n{}", system_instructions, FORMAT_INSTRUCTION),
                }],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: Some(self.build_generation_config(params)),
        };

        let text = self.generate_content(&request).await?;
        parse_prediction_reply(&text)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.is_empty() {
            Err(ProviderError::NotConfigured(
                "Gemini API key not configured".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(alias = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
