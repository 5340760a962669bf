//! Per-image error types.
//!
//! A failure while processing one `<image>` element is reported and the
//! element is skipped; it never aborts the run. Document-level failures
//! (unreadable input, malformed XML) go through `anyhow` instead.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while processing a single image element
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("malformed transform attribute: {0}")]
    Transform(String),

    #[error("cannot take clip points from <{0}> elements, only <rect> is supported")]
    UnsupportedClipShape(String),

    #[error("<{tag}> has no usable `{attr}` attribute")]
    MissingAttr { tag: String, attr: String },

    #[error("image element has no file reference or data")]
    MissingHref,

    #[error("unsupported embedded image data `{0}`")]
    UnsupportedDataUri(String),

    #[error("clip leaves no visible pixels ({width}x{height} source)")]
    EmptyCrop { width: u32, height: u32 },

    #[error("can't read image link `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("image codec error")]
    Codec(#[from] image::ImageError),

    #[error("embedded data is not valid base64")]
    Base64(#[from] base64::DecodeError),
}

impl ImageError {
    /// Shorthand for a missing or non-numeric attribute.
    pub fn missing_attr(tag: &str, attr: &str) -> Self {
        Self::MissingAttr {
            tag: tag.to_string(),
            attr: attr.to_string(),
        }
    }
}
