//! Base64 image payloads.

use super::SchemaError;
use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Largest accepted decoded image (4 MiB).
pub const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// Standard alphabet that tolerates non-zero trailing bits, as most encoders do.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// Accepted values for [`ImageInput::format`].
pub const SUPPORTED_FORMATS: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/gif"];

/// Single image input in base64 form.
///
/// `base64_data` is stored without any `data:image/...;base64,` prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawImageInput")]
pub struct ImageInput {
    image_id: String,
    base64_data: String,
    format: String,
}

#[derive(Deserialize)]
struct RawImageInput {
    image_id: String,
    base64_data: String,
    format: String,
}

impl TryFrom<RawImageInput> for ImageInput {
    type Error = SchemaError;

    fn try_from(raw: RawImageInput) -> Result<Self, Self::Error> {
        ImageInput::new(raw.image_id, raw.base64_data, raw.format)
    }
}

impl ImageInput {
    pub fn new(
        image_id: impl Into<String>,
        base64_data: impl AsRef<str>,
        format: impl Into<String>,
    ) -> Result<Self, SchemaError> {
        let format = format.into();
        if !SUPPORTED_FORMATS.contains(&format.as_str()) {
            return Err(SchemaError::UnsupportedFormat(format));
        }

        let base64_data: String = strip_data_url_prefix(base64_data.as_ref())
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();

        // Reject obviously oversized payloads before allocating the decode buffer.
        let estimated = base64_data.len() / 4 * 3;
        if estimated > MAX_IMAGE_BYTES + 3 {
            return Err(SchemaError::ImageTooLarge {
                size: estimated,
                limit: MAX_IMAGE_BYTES,
            });
        }

        let decoded = LENIENT_BASE64
            .decode(&base64_data)
            .map_err(|e| SchemaError::InvalidBase64(e.to_string()))?;
        if decoded.len() > MAX_IMAGE_BYTES {
            return Err(SchemaError::ImageTooLarge {
                size: decoded.len(),
                limit: MAX_IMAGE_BYTES,
            });
        }

        Ok(Self {
            image_id: image_id.into(),
            base64_data,
            format,
        })
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn base64_data(&self) -> &str {
        &self.base64_data
    }

    /// Format exactly as submitted.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Registered MIME type for the image (`image/jpg` is sent as `image/jpeg`).
    pub fn mime_type(&self) -> &str {
        match self.format.as_str() {
            "image/jpg" => "image/jpeg",
            other => other,
        }
    }

    /// Data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.base64_data)
    }

    pub fn is_empty(&self) -> bool {
        self.base64_data.is_empty()
    }
}

/// Strip a leading `data:image/<kind>;base64,` prefix. Anything that does not
/// match that exact shape is returned unchanged.
fn strip_data_url_prefix(value: &str) -> &str {
    let Some(rest) = value.strip_prefix("data:image/") else {
        return value;
    };
    let Some((kind, payload)) = rest.split_once(";base64,") else {
        return value;
    };
    if !kind.is_empty() && kind.chars().all(|c| c.is_ascii_alphabetic()) {
        payload
    } else {
        value
    }
}
