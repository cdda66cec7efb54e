//! Error types for mapping-renderer.

use mapping_vtl::{EvalError, ParseError};
use thiserror::Error;

/// Failures of the `$util` helpers and of `$input` JSON access.
#[derive(Debug, Error)]
pub enum UtilError {
    /// `base64Encode` only accepts characters in the single-byte range.
    #[error("character {character:?} at offset {offset} is outside the single-byte range")]
    NonLatin1 { character: char, offset: usize },

    /// Input to `base64Decode` is not valid base64.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A `%` not followed by two hex digits.
    #[error("malformed percent-encoding at byte offset {offset}")]
    MalformedPercent { offset: usize },

    /// Percent-decoded bytes are not UTF-8.
    #[error("percent-decoded text is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Strict JSON parse failure.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A JSONPath expression outside the supported subset.
    #[error("invalid JSONPath {path:?}: {message}")]
    JsonPath { path: String, message: String },
}

/// All errors that can arise from rendering a mapping template.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template text does not parse.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Evaluation aborted, usually because a helper method failed.
    #[error("template evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
}

impl RenderError {
    /// The helper failure behind an evaluation error, if any.
    pub fn util_error(&self) -> Option<&UtilError> {
        match self {
            RenderError::Evaluation(EvalError::Method { source, .. }) => source.downcast_ref::<UtilError>(),
            _ => None,
        }
    }
}
