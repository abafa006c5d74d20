//! Request/response schema for the vision API.
//!
//! Every type that crosses the HTTP boundary lives here. Field-level rules
//! that serde cannot express are enforced at construction time, so a value
//! of one of these types is always valid.

pub mod image;
pub mod prediction;
pub mod text;

pub use image::{ImageInput, MAX_IMAGE_BYTES, SUPPORTED_FORMATS};
pub use prediction::{
    ImagePrediction, PredictionDetail, PredictionRequest, PredictionResponse, PredictionStatus,
    MAX_BATCH_SIZE,
};
pub use text::{ComparisonRequest, ComparisonResponse, GenerateRequest, GenerateResponse};

use thiserror::Error;

/// Construction-time validation failure for a schema value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Invalid base64 encoding: {0}")]
    InvalidBase64(String),

    #[error("Image size {size} bytes exceeds {limit} byte limit")]
    ImageTooLarge { size: usize, limit: usize },

    #[error("Unsupported image format '{0}', expected image/png, image/jpeg, image/jpg or image/gif")]
    UnsupportedFormat(String),

    #[error("Label must not be empty")]
    EmptyLabel,

    #[error("Label must be a single word, got '{0}'")]
    MultiWordLabel(String),
}
