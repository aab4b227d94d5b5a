//! Watermark requests and backend selection.

use super::text_renderer::Color;
use super::WatermarkError;
use crate::config::WatermarkConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default font size when the caller gives none.
pub const DEFAULT_FONT_SIZE: i32 = 20;

/// Which compositor handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Paginated documents (PDF)
    Vector,
    /// Single raster images
    Raster,
}

impl BackendKind {
    /// Infer the backend from the file extension: `pdf` is vector, anything
    /// else raster.
    pub fn infer(source: &Path) -> Self {
        match super::output::source_extension(source).as_deref() {
            Some("pdf") => BackendKind::Vector,
            _ => BackendKind::Raster,
        }
    }
}

impl FromStr for BackendKind {
    type Err = WatermarkError;

    fn from_str(hint: &str) -> Result<Self, Self::Err> {
        match hint.trim().to_lowercase().as_str() {
            "pdf" | "vector" => Ok(BackendKind::Vector),
            "img" | "image" | "raster" => Ok(BackendKind::Raster),
            _ => Err(WatermarkError::InvalidBackendKind(hint.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Vector => write!(f, "vector"),
            BackendKind::Raster => write!(f, "raster"),
        }
    }
}

/// One watermarking job: which file, what label, where and how.
///
/// Color and font family left unset fall back to the configured defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkRequest {
    pub source: PathBuf,
    pub text: String,
    /// Horizontal anchor; negative is measured from the right edge.
    pub x: i32,
    /// Vertical anchor; negative is measured from the bottom edge.
    pub y: i32,
    pub font_size: i32,
    /// Counter-clockwise rotation in degrees.
    pub angle: i32,
    pub color: Option<Color>,
    pub font_family: Option<String>,
    /// Explicit backend hint (`pdf`, `img`, ...); inferred from the extension when absent.
    pub backend: Option<String>,
}

impl WatermarkRequest {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            x: 0,
            y: 0,
            font_size: DEFAULT_FONT_SIZE,
            angle: 0,
            color: None,
            font_family: None,
            backend: None,
        }
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_font_size(mut self, font_size: i32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn with_angle(mut self, degrees: i32) -> Self {
        self.angle = degrees;
        self
    }

    pub fn with_color(mut self, color: impl Into<Color>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn with_backend(mut self, hint: impl Into<String>) -> Self {
        self.backend = Some(hint.into());
        self
    }

    /// Requested color, or the configured default.
    pub fn color_or_default(&self, config: &WatermarkConfig) -> Color {
        self.color.unwrap_or(config.default_color)
    }

    /// Requested font family, or the configured default.
    pub fn font_family_or_default<'a>(&'a self, config: &'a WatermarkConfig) -> &'a str {
        self.font_family
            .as_deref()
            .unwrap_or(&config.default_font_family)
    }

    /// Backend from the explicit hint, else from the extension.
    pub fn backend_kind(&self) -> Result<BackendKind, WatermarkError> {
        match &self.backend {
            Some(hint) => hint.parse(),
            None => Ok(BackendKind::infer(&self.source)),
        }
    }
}
