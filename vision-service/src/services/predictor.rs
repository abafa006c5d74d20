//! Batch image prediction.
//!
//! One provider call is made per request. The provider is asked for an entry
//! per image keyed by `image_id`, and the reply is partitioned back onto the
//! request's images before schema validation, threshold filtering and top-k
//! truncation.

use crate::models::{ImagePrediction, PredictionDetail, PredictionRequest, PredictionResponse, SchemaError};
use crate::services::metrics;
use crate::services::providers::{
    GenerationParams, ImageLabels, ImagePart, ModelKind, PredictionOutput, ProviderError,
    ProviderSet, VisionProvider,
};
use chrono::Utc;
use service_core::error::AppError;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Output tokens budgeted per image in a batch.
pub const TOKENS_PER_IMAGE: u32 = 300;

#[derive(Error, Debug)]
pub enum PredictionError {
    /// Caller error, surfaced as 400.
    #[error("{0}")]
    InvalidRequest(String),

    #[error("Provider {provider} failed")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("Provider {provider} did not answer within {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider returned unusable predictions: {0}")]
    MalformedOutput(String),
}

impl From<PredictionError> for AppError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::InvalidRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            other => AppError::InternalError(
                anyhow::Error::new(other).context("Error processing images"),
            ),
        }
    }
}

impl From<SchemaError> for PredictionError {
    fn from(err: SchemaError) -> Self {
        PredictionError::MalformedOutput(err.to_string())
    }
}

/// Settings that shape every prediction call.
#[derive(Debug, Clone)]
pub struct PredictorSettings {
    pub temperature: f32,
    pub timeout: Duration,
    pub strict_model_selection: bool,
}

pub struct Predictor {
    providers: ProviderSet,
    settings: PredictorSettings,
}

impl Predictor {
    pub fn new(providers: ProviderSet, settings: PredictorSettings) -> Self {
        Self {
            providers,
            settings,
        }
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    /// Map a request's `model` string onto a provider.
    ///
    /// Unknown names fall back to OpenAI unless strict selection is enabled.
    pub fn resolve_model(&self, model: &str) -> Result<ModelKind, PredictionError> {
        match ModelKind::parse(model) {
            Some(kind) => Ok(kind),
            None if self.settings.strict_model_selection => Err(PredictionError::InvalidRequest(
                format!("Unknown model '{}', expected 'openai' or 'gemini'", model),
            )),
            None => {
                tracing::warn!(
                    requested = %model,
                    fallback = %ModelKind::OpenAi,
                    "Unknown model requested, using default provider"
                );
                Ok(ModelKind::OpenAi)
            }
        }
    }

    /// Provider for a request's `model` string.
    pub fn provider_for(&self, model: &str) -> Result<&Arc<dyn VisionProvider>, PredictionError> {
        let kind = self.resolve_model(model)?;
        Ok(self.providers.get(kind))
    }

    pub async fn predict_images(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, PredictionError> {
        let start = Instant::now();

        if request.images.is_empty() {
            return Err(PredictionError::InvalidRequest(
                "No images provided in request".to_string(),
            ));
        }

        let provider = self.provider_for(&request.model)?;
        let params = GenerationParams {
            max_tokens: TOKENS_PER_IMAGE * request.images.len() as u32,
            temperature: self.settings.temperature,
        };

        tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            images = request.images.len(),
            top_k = request.top_k,
            temperature = params.temperature,
            max_tokens = params.max_tokens,
            "Starting image prediction"
        );

        let system_instructions = system_instructions(request.top_k);
        let parts: Vec<ImagePart> = request
            .images
            .iter()
            .enumerate()
            .map(|(idx, image)| ImagePart {
                label: format!("Image {} (image_id: {}):", idx + 1, image.image_id()),
                data: image.base64_data().to_string(),
                mime_type: image.mime_type().to_string(),
            })
            .collect();

        let call_started = Instant::now();
        let output = match tokio::time::timeout(
            self.settings.timeout,
            provider.predict_images(&system_instructions, &parts, &params),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                metrics::record_provider_error(provider.name(), e.kind());
                tracing::error!(provider = provider.name(), error = %e, "Image prediction failed");
                return Err(PredictionError::Provider {
                    provider: provider.name().to_string(),
                    source: e,
                });
            }
            Err(_) => {
                metrics::record_provider_error(provider.name(), "timeout");
                tracing::error!(
                    provider = provider.name(),
                    timeout_secs = self.settings.timeout.as_secs_f64(),
                    "Image prediction timed out"
                );
                return Err(PredictionError::Timeout {
                    provider: provider.name().to_string(),
                    timeout: self.settings.timeout,
                });
            }
        };
        metrics::record_provider_latency(
            provider.name(),
            provider.model(),
            call_started.elapsed().as_secs_f64(),
        );

        let results = partition(request, output)
            .and_then(|per_image| {
                per_image
                    .into_iter()
                    .zip(&request.images)
                    .map(|(labels, image)| {
                        let predictions =
                            coerce_predictions(labels, request.top_k, request.confidence_threshold)?;
                        Ok(ImagePrediction {
                            image_id: image.image_id().to_string(),
                            predictions,
                            processed_at: Utc::now(),
                            processing_time_ms: start.elapsed().as_secs_f64() * 1000.0,
                        })
                    })
                    .collect::<Result<Vec<_>, PredictionError>>()
            })
            .map_err(|e| {
                tracing::error!(provider = provider.name(), error = %e, "Could not use provider predictions");
                e
            })?;

        metrics::record_images_processed(provider.name(), results.len());
        tracing::info!(
            provider = provider.name(),
            images = results.len(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Successfully processed images"
        );

        Ok(PredictionResponse::success(
            request.model.clone(),
            request.top_k,
            results,
        ))
    }
}

/// System instructions for a batch, parameterized by `top_k`.
pub fn system_instructions(top_k: u32) -> String {
    format!(
        "Analyze the images and provide:\n\
         - Top {top_k} single-word labels for each image\n\
         - Confidence scores between 0 and 1\n\
         - Brief reasons for each prediction\n\
         Each image is preceded by its image_id. Return exactly one entry per image, \
         using that image_id, with the predictions for that image only.\n\
         Output in JSON format."
    )
}

/// Reorder the provider's entries to match the request's images.
///
/// Entries are matched by `image_id`. Images sharing an id take that id's
/// entries in the order the provider returned them, reusing the last one if
/// the provider collapsed them. When the provider omits
/// ids entirely but returns one entry per image, they are taken in order.
fn partition(
    request: &PredictionRequest,
    output: PredictionOutput,
) -> Result<Vec<ImageLabels>, PredictionError> {
    let entries = output.images;

    if entries.len() == request.images.len() && entries.iter().all(|e| e.image_id.is_empty()) {
        return Ok(entries);
    }

    let mut by_id: HashMap<String, VecDeque<ImageLabels>> = HashMap::with_capacity(entries.len());
    for entry in entries {
        by_id
            .entry(entry.image_id.clone())
            .or_default()
            .push_back(entry);
    }

    request
        .images
        .iter()
        .map(|image| {
            by_id
                .get_mut(image.image_id())
                .and_then(|queue| {
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    }
                })
                .ok_or_else(|| {
                    PredictionError::MalformedOutput(format!(
                        "no predictions returned for image '{}'",
                        image.image_id()
                    ))
                })
        })
        .collect()
}

/// Validate labels, clamp confidence to `[0, 1]`, drop entries below the
/// threshold, then keep the `top_k` most confident.
fn coerce_predictions(
    labels: ImageLabels,
    top_k: u32,
    confidence_threshold: f64,
) -> Result<Vec<PredictionDetail>, PredictionError> {
    let mut predictions = labels
        .predictions
        .into_iter()
        .map(|raw| {
            let confidence = if raw.confidence.is_nan() {
                0.0
            } else {
                raw.confidence.clamp(0.0, 1.0)
            };
            PredictionDetail::new(raw.label.trim(), confidence, raw.reason)
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    predictions.retain(|p| p.confidence() >= confidence_threshold);
    predictions.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
    predictions.truncate(top_k as usize);

    Ok(predictions)
}
