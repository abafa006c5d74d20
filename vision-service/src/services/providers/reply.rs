//! Parsers for provider replies that arrive as free text.

use super::{PredictionOutput, ProviderError};

/// Parse a free-text reply that should contain a [`PredictionOutput`] JSON
/// object. Markdown code fences and prose around the object are tolerated;
/// anything else is an [`ProviderError::InvalidResponse`].
pub fn parse_prediction_reply(text: &str) -> Result<PredictionOutput, ProviderError> {
    let text = text.trim();
    let body = strip_code_fence(text);

    match serde_json::from_str::<PredictionOutput>(body) {
        Ok(output) => Ok(output),
        Err(first_err) => {
            let embedded = match (text.find('{'), text.rfind('}')) {
                (Some(start), Some(end)) if start < end => &text[start..=end],
                _ => {
                    return Err(ProviderError::InvalidResponse(format!(
                        "reply is not a JSON object: {}",
                        first_err
                    )))
                }
            };
            serde_json::from_str(embedded).map_err(|e| {
                ProviderError::InvalidResponse(format!("reply does not match prediction schema: {}", e))
            })
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. "json"); the body may follow on the same line.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}

/// Extract a similarity score from a reply such as `"0.95"`.
///
/// Every character other than ASCII digits and `.` is discarded before
/// parsing; the result is clamped to `[0, 1]`.
pub fn parse_similarity(reply: &str) -> Result<f64, ProviderError> {
    let cleaned: String = reply
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(ProviderError::InvalidResponse(format!(
            "no numeric score in reply '{}'",
            reply.trim()
        )));
    }

    let similarity: f64 = cleaned.parse().map_err(|e| {
        ProviderError::InvalidResponse(format!("could not parse score '{}': {}", cleaned, e))
    })?;

    Ok(similarity.clamp(0.0, 1.0))
}
