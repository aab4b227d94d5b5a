//! Watermark error types.
//!
//! Defines errors that can occur while resolving inputs, fonts and formats, and
//! while compositing a label onto a document or image.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed underlying cause carried by [`WatermarkError::WatermarkFailure`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during watermark processing.
#[derive(Debug, Error)]
pub enum WatermarkError {
    /// Source path is missing or cannot be opened for reading
    #[error("File {} is not readable: {source}", path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither the bold nor the regular variant of a font family exists
    #[error("Font not found: {0}")]
    FontNotFound(String),

    /// Raster format is unknown, or known but without a codec in this build
    #[error("Unsupported image type: {0}")]
    UnsupportedImageType(String),

    /// Source vector document cannot be opened or parsed
    #[error("Failed to parse document: {0}")]
    DocumentParseFailure(String),

    /// Explicit backend hint names no known backend
    #[error("Invalid backend kind: {0}")]
    InvalidBackendKind(String),

    /// Any other backend failure (decode, draw, encode, write)
    #[error("Watermark failed: {context}: {source}")]
    WatermarkFailure {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Invalid configuration
    #[error("Watermark configuration error: {0}")]
    Config(String),
}

impl WatermarkError {
    /// Wrap an underlying cause as a [`WatermarkError::WatermarkFailure`].
    pub fn failure(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        WatermarkError::WatermarkFailure {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn unsupported_image(what: impl Into<String>) -> Self {
        WatermarkError::UnsupportedImageType(what.into())
    }
}
