//! Mock provider implementation for testing.
//!
//! Replies are deterministic: text comes from a caller-supplied responder and
//! batch predictions either echo the requested image ids or come from a
//! canned [`PredictionOutput`].

use super::{
    GenerationParams, ImageLabels, ImagePart, PredictionOutput, ProviderError, RawPrediction,
    VisionProvider,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type TextResponder = Arc<dyn Fn(&str) -> Result<String, ProviderError> + Send + Sync>;

enum PredictionMode {
    /// Three labels per image, keyed by the id found in each image label.
    Echo,
    Fixed(PredictionOutput),
}

/// Mock vision provider for testing.
pub struct MockVisionProvider {
    name: &'static str,
    enabled: bool,
    delay: Option<Duration>,
    responder: TextResponder,
    predictions: PredictionMode,
    calls: AtomicUsize,
}

impl MockVisionProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            enabled: true,
            delay: None,
            responder: Arc::new(|prompt| Ok(format!("Mock response for: {}", prompt))),
            predictions: PredictionMode::Echo,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider whose every call fails with [`ProviderError::NotConfigured`].
    pub fn disabled(name: &'static str) -> Self {
        Self {
            enabled: false,
            ..Self::new(name)
        }
    }

    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, ProviderError> + Send + Sync + 'static,
    {
        self.responder = Arc::new(responder);
        self
    }

    pub fn with_predictions(mut self, output: PredictionOutput) -> Self {
        self.predictions = PredictionMode::Fixed(output);
        self
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of provider calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn begin_call(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.enabled {
            return Err(ProviderError::NotConfigured(format!(
                "Mock provider '{}' not enabled",
                self.name
            )));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

/// Pull `<id>` out of a label of the form `Image N (image_id: <id>):`.
fn image_id_from_label(label: &str) -> String {
    label
        .split_once("image_id: ")
        .and_then(|(_, rest)| rest.strip_suffix("):"))
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn default_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: 1000,
            temperature: 0.8,
        }
    }

    async fn complete(
        &self,
        prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, ProviderError> {
        self.begin_call().await?;
        (self.responder)(prompt)
    }

    async fn predict_images(
        &self,
        _system_instructions: &str,
        images: &[ImagePart],
        _params: &GenerationParams,
    ) -> Result<PredictionOutput, ProviderError> {
        self.begin_call().await?;

        match &self.predictions {
            PredictionMode::Fixed(output) => Ok(output.clone()),
            PredictionMode::Echo => Ok(PredictionOutput {
                images: images
                    .iter()
                    .map(|image| ImageLabels {
                        image_id: image_id_from_label(&image.label),
                        predictions: vec![
                            RawPrediction {
                                label: "object".to_string(),
                                confidence: 0.9,
                                reason: "Mock primary label".to_string(),
                            },
                            RawPrediction {
                                label: "shape".to_string(),
                                confidence: 0.6,
                                reason: "Mock secondary label".to_string(),
                            },
                            RawPrediction {
                                label: "color".to_string(),
                                confidence: 0.3,
                                reason: "Mock tertiary label".to_string(),
                            },
                        ],
                    })
                    .collect(),
            }),
        }
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.enabled {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(format!(
                "Mock provider '{}' not enabled",
                self.name
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_image_id_from_label() {
        assert_eq!(image_id_from_label("Image 2 (image_id: img_b):"), "img_b");
        assert_eq!(image_id_from_label("Image 1:"), "");
    }

    #[tokio::test]
    async fn disabled_provider_fails_every_call() {
        let provider = MockVisionProvider::disabled("openai");
        assert!(provider.generate_text("hi").await.is_err());
        assert!(provider.health_check().await.is_err());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn responder_drives_similarity() {
        let provider = MockVisionProvider::new("openai").with_responder(|_| Ok("0.42".into()));
        assert_eq!(provider.compare_semantics("a", "b").await.unwrap(), 0.42);
    }
}
