//! Strict JSON parsing of response bodies.

use serde_json::Value;
use thiserror::Error;

use crate::text::collapse_preview;

/// Error returned when a response body is not valid JSON.
#[derive(Debug, Error)]
#[error("failed to parse JSON response ({status_note}): {source}. body preview: {body_preview}")]
pub struct JsonParseError {
    status_note: String,
    #[source]
    source: serde_json::Error,
    body_preview: String,
}

impl JsonParseError {
    pub fn body_preview(&self) -> &str {
        &self.body_preview
    }
}

/// Parse a response body, decorating failures with the HTTP status and a
/// whitespace-collapsed preview of at most 200 characters.
///
/// An empty or blank body parses to `Value::Null`.
pub fn parse_json_strict(text: &str, status: Option<u16>) -> Result<Value, JsonParseError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str::<Value>(text).map_err(|source| JsonParseError {
        status_note: status
            .map(|code| format!("status {code}"))
            .unwrap_or_else(|| "unknown status".to_string()),
        source,
        body_preview: collapse_preview(text, 200),
    })
}
