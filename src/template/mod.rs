//! # Document Templates
//!
//! The two concrete documents: a landscape [`certificate`] and a portrait
//! [`portfolio`]. Each module exposes `compose`, which validates fields and
//! builds the [`Page`](crate::canvas::Page), and `render`, which also
//! serializes it.

pub mod certificate;
pub mod portfolio;

use crate::config::RenderConfig;
use crate::error::AtelierError;
use crate::pdf::Metadata;

/// Check that every `(name, value)` pair has a non-blank value.
///
/// The error lists the blank fields in the order given.
pub(crate) fn validate_required(fields: &[(&'static str, &str)]) -> Result<(), AtelierError> {
    let missing: Vec<&'static str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        log::debug!("validation failed: {}", missing.join(", "));
        Err(AtelierError::Validation { missing })
    }
}

/// An optional field, treating blank strings as absent.
pub(crate) fn optional(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Lowercase ASCII slug for file names. Runs of anything else collapse to
/// a single `-`.
pub(crate) fn slug(value: &str) -> String {
    let mut out = String::new();
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("document");
    }
    out
}

pub(crate) fn metadata(title: String, subject: &str, config: &RenderConfig) -> Metadata {
    Metadata {
        title: Some(title),
        author: config.metadata.author.clone(),
        subject: Some(subject.trim().to_string()),
        creator: Some(config.metadata.creator.clone()),
    }
}
