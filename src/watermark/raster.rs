//! Raster image compositor.
//!
//! Pipeline: decode → duplicate canvas → resolve font → resolve position →
//! allocate color → draw rotated text → encode in the source format.
//!
//! The source buffer is never drawn on; the label goes onto a fresh canvas of
//! the same dimensions, and the encoded result is written atomically.

use super::font::FontResolver;
use super::format::RasterFormat;
use super::output::write_bytes_atomic;
use super::position::{resolve_position, Dimensions};
use super::rotation::{DirectAngleRotation, RotationStrategy};
use super::text_renderer::{draw_text, TextStyle};
use super::{WatermarkError, WatermarkRequest};
use crate::config::WatermarkConfig;
use image::{DynamicImage, RgbaImage};
use std::path::Path;

/// Result of watermarking one image in memory.
#[derive(Debug)]
pub struct RenderedImage {
    pub format: RasterFormat,
    pub dimensions: (u32, u32),
    pub data: Vec<u8>,
}

/// Draws a label onto single raster images.
#[derive(Debug, Clone)]
pub struct RasterCompositor<'a> {
    config: &'a WatermarkConfig,
    fonts: FontResolver,
}

impl<'a> RasterCompositor<'a> {
    pub fn new(config: &'a WatermarkConfig) -> Self {
        Self {
            config,
            fonts: FontResolver::new(config.font_dirs.iter().cloned()),
        }
    }

    /// Watermark `request.source` and write the result to `output`.
    pub fn composite(
        &self,
        request: &WatermarkRequest,
        output: &Path,
    ) -> Result<RenderedImage, WatermarkError> {
        let bytes = std::fs::read(&request.source).map_err(|e| {
            WatermarkError::failure(format!("read {}", request.source.display()), e)
        })?;

        let rendered = self.render(&bytes, request)?;
        write_bytes_atomic(output, &rendered.data)?;

        tracing::debug!(
            output = %output.display(),
            format = rendered.format.name(),
            bytes = rendered.data.len(),
            "Wrote watermarked image"
        );
        Ok(rendered)
    }

    /// Watermark encoded image bytes, returning the re-encoded image.
    pub fn render(
        &self,
        bytes: &[u8],
        request: &WatermarkRequest,
    ) -> Result<RenderedImage, WatermarkError> {
        let format = RasterFormat::detect(bytes)?;
        let codec = format.require_codec()?;

        let decoded = (codec.decode)(bytes)?;
        let mut canvas = duplicate_canvas(&decoded);
        let dimensions = canvas.dimensions();

        let family = request.font_family_or_default(self.config);
        let resolved = self.fonts.resolve(family)?;

        let position = resolve_position(
            request.x,
            request.y,
            &Dimensions::from(dimensions),
            self.config.raster_unit_scale,
        );
        let style = TextStyle {
            px_size: self.config.raster_px_size(request.font_size),
            color: request.color_or_default(self.config),
        };

        tracing::debug!(
            format = format.name(),
            width = dimensions.0,
            height = dimensions.1,
            x = position.x,
            y = position.y,
            angle = request.angle,
            font = %resolved.path.display(),
            "Drawing raster watermark"
        );

        DirectAngleRotation::new(request.angle).apply_rotated(&mut canvas, |canvas, degrees| {
            draw_text(
                canvas,
                &resolved.font,
                &style,
                (position.x, position.y),
                degrees,
                &request.text,
            )
        })?;

        let data = (codec.encode)(&canvas)?;
        Ok(RenderedImage {
            format,
            dimensions,
            data,
        })
    }
}

/// Copy the decoded image into a new true-color canvas of the same size.
fn duplicate_canvas(decoded: &DynamicImage) -> RgbaImage {
    decoded.to_rgba8()
}
