//! Structured error types for the Atelier composition engine.
//!
//! Validation problems are reported before anything is drawn. Decode
//! failures only surface for fonts: an image that cannot be decoded is a
//! normal runtime condition and becomes a placeholder card instead.

use thiserror::Error;

/// The unified error type returned by all public Atelier API functions.
#[derive(Debug, Error)]
pub enum AtelierError {
    /// One or more required text fields were missing or blank.
    #[error("Missing required field(s): {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    /// A font could not be decoded. Fonts are never optional.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Drawing or serialization failed.
    #[error("Render error: {0}")]
    Render(String),

    /// JSON input failed to parse as a render request or configuration.
    #[error("Failed to parse input: {source}{}", hint_suffix(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    /// Reading an input or configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {}", hint)
    }
}

impl From<serde_json::Error> for AtelierError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the expected shape. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input. Is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        AtelierError::Parse { source: e, hint }
    }
}

/// Why an image or font could not be turned into something drawable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("image data too short")]
    TooShort,
    #[error("unsupported image format (expected JPEG, PNG or WebP)")]
    UnsupportedFormat,
    #[error("image decode failed: {0}")]
    Image(String),
    #[error("image has zero intrinsic size")]
    ZeroDimension,
    #[error("base64 decode failed: {0}")]
    Base64(String),
    #[error("cannot read image source: {0}")]
    Source(String),
    #[error("font '{family}' could not be parsed: {reason}")]
    Font { family: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_fields() {
        let err = AtelierError::Validation {
            missing: vec!["styleName", "date"],
        };
        assert_eq!(
            err.to_string(),
            "Missing required field(s): styleName, date"
        );
    }

    #[test]
    fn parse_error_carries_hint() {
        let err: AtelierError = serde_json::from_str::<serde_json::Value>("{\"a\": 1,}")
            .unwrap_err()
            .into();
        match &err {
            AtelierError::Parse { hint, .. } => assert!(hint.contains("trailing commas")),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(err.to_string().contains("Hint:"));
    }

    #[test]
    fn font_decode_error_is_wrapped() {
        let err: AtelierError = DecodeError::Font {
            family: "Script".to_string(),
            reason: "bad magic".to_string(),
        }
        .into();
        assert!(matches!(err, AtelierError::Decode(DecodeError::Font { .. })));
    }
}
