//! Text watermark rendering for raster images.
//!
//! Draws a label straight onto an RGBA canvas, anchored at its baseline origin
//! and rotated counter-clockwise about that origin.
//!
//! # Features
//!
//! - Hex color parsing (#RGB and #RRGGBB formats)
//! - Kerned glyph layout through `ab_glyph`
//! - Arbitrary rotation angle with bilinear coverage sampling
//!
//! # Example
//!
//! ```ignore
//! use watermark_engine::watermark::text_renderer::{draw_text, parse_hex_color, TextStyle};
//!
//! let style = TextStyle {
//!     px_size: 26.7,
//!     color: parse_hex_color("#FF0000").unwrap(),
//! };
//! draw_text(&mut canvas, &font, &style, (28.0, 28.0), 0.0, "© 2024")?;
//! ```

use super::WatermarkError;
use ab_glyph::{point, Font, GlyphId, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// RGB color of the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Light gray (192, 192, 192).
    pub fn light_gray() -> Self {
        Self::new(192, 192, 192)
    }

    /// Channels scaled to the 0.0–1.0 range used by PDF color operators.
    pub fn to_unit_rgb(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::light_gray()
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        parse_hex_color(&hex).map_err(serde::de::Error::custom)
    }
}

/// Parse a hex color string into RGB components.
///
/// Supports both #RGB and #RRGGBB formats.
///
/// # Examples
///
/// ```
/// use watermark_engine::watermark::text_renderer::{parse_hex_color, Color};
///
/// assert_eq!(parse_hex_color("#FFF").unwrap(), Color::new(255, 255, 255));
/// assert_eq!(parse_hex_color("#C0C0C0").unwrap(), Color::light_gray());
/// ```
pub fn parse_hex_color(hex: &str) -> Result<Color, WatermarkError> {
    let hex = hex
        .strip_prefix('#')
        .ok_or_else(|| WatermarkError::Config("Color must start with '#'".to_string()))?;
    if !hex.is_ascii() {
        return Err(WatermarkError::Config(format!(
            "Color '#{}' must use hex digits only",
            hex
        )));
    }

    let digit = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| WatermarkError::Config(format!("Invalid hex digit in '#{}'", hex)))
    };

    match hex.len() {
        3 => {
            // #RGB: each digit doubled, 0xF -> 0xFF
            let r = digit(&hex[0..1])?;
            let g = digit(&hex[1..2])?;
            let b = digit(&hex[2..3])?;
            Ok(Color::new(r * 17, g * 17, b * 17))
        }
        6 => Ok(Color::new(
            digit(&hex[0..2])?,
            digit(&hex[2..4])?,
            digit(&hex[4..6])?,
        )),
        _ => Err(WatermarkError::Config(format!(
            "Color must be #RGB or #RRGGBB format, got {} characters",
            hex.len()
        ))),
    }
}

/// Size and color of the label.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Font size in pixels.
    pub px_size: f32,
    pub color: Color,
}

/// Upper bound on coverage mask cells (256 MiB of `f32`).
///
/// Labels whose unrotated extent exceeds this are refused rather than
/// rasterized.
pub const MAX_MASK_CELLS: usize = 64 * 1024 * 1024;

/// Glyph coverage of an unrotated label, in baseline-relative pixel space.
///
/// `(origin_x, origin_y)` is the position of cell (0, 0) relative to the
/// baseline origin; `origin_y` is negative for glyphs rising above it.
struct CoverageMask {
    width: usize,
    height: usize,
    origin_x: i64,
    origin_y: i64,
    data: Vec<f32>,
}

impl CoverageMask {
    fn index(&self, x: i64, y: i64) -> Option<usize> {
        let x = usize::try_from(x).ok().filter(|&x| x < self.width)?;
        let y = usize::try_from(y).ok().filter(|&y| y < self.height)?;
        Some(y * self.width + x)
    }

    fn at(&self, x: i64, y: i64) -> f32 {
        self.index(x, y).map_or(0.0, |i| self.data[i])
    }

    fn accumulate(&mut self, x: i64, y: i64, coverage: f32) {
        if let Some(i) = self.index(x, y) {
            let cell = &mut self.data[i];
            *cell = (*cell + coverage).min(1.0);
        }
    }

    /// Bilinear sample at a baseline-relative position.
    fn sample(&self, u: f32, v: f32) -> f32 {
        let fx = u - self.origin_x as f32 - 0.5;
        let fy = v - self.origin_y as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        self.at(x0, y0) * (1.0 - tx) * (1.0 - ty)
            + self.at(x0 + 1, y0) * tx * (1.0 - ty)
            + self.at(x0, y0 + 1) * (1.0 - tx) * ty
            + self.at(x0 + 1, y0 + 1) * tx * ty
    }
}

/// Number of mask cells for a `width` x `height` label, if within
/// [`MAX_MASK_CELLS`].
fn mask_cells(width: i64, height: i64) -> Option<usize> {
    let width = usize::try_from(width.max(1)).ok()?;
    let height = usize::try_from(height.max(1)).ok()?;
    width
        .checked_mul(height)
        .filter(|&cells| cells <= MAX_MASK_CELLS)
}

/// Lay out and rasterize `text` with its baseline origin at (0, 0).
///
/// Returns `Ok(None)` when no glyph has an outline.
fn rasterize<F: Font>(
    font: &F,
    px_size: f32,
    text: &str,
) -> Result<Option<CoverageMask>, WatermarkError> {
    let scale = PxScale::from(px_size);
    let scaled_font = font.as_scaled(scale);

    let mut outlines = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut prev_glyph: Option<GlyphId> = None;

    for c in text.chars() {
        let glyph_id = scaled_font.glyph_id(c);
        if glyph_id.0 == 0 && !c.is_whitespace() {
            tracing::warn!(character = %c, "Font has no glyph for character");
        }

        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, point(cursor_x, 0.0));
        if let Some(outlined) = font.outline_glyph(glyph) {
            outlines.push(outlined);
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    let bounds: Vec<_> = outlines.iter().map(|o| o.px_bounds()).collect();
    let (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) = (
        bounds.iter().map(|b| b.min.x).reduce(f32::min),
        bounds.iter().map(|b| b.min.y).reduce(f32::min),
        bounds.iter().map(|b| b.max.x).reduce(f32::max),
        bounds.iter().map(|b| b.max.y).reduce(f32::max),
    ) else {
        return Ok(None);
    };

    let origin_x = min_x.floor() as i64;
    let origin_y = min_y.floor() as i64;
    let width = (max_x.ceil() as i64).saturating_sub(origin_x);
    let height = (max_y.ceil() as i64).saturating_sub(origin_y);

    let cells = mask_cells(width, height).ok_or_else(|| {
        WatermarkError::failure(
            "draw text",
            format!(
                "label of {}x{} px at size {} exceeds {} coverage cells",
                width, height, px_size, MAX_MASK_CELLS
            ),
        )
    })?;

    let mut mask = CoverageMask {
        width: width.max(1) as usize,
        height: height.max(1) as usize,
        origin_x,
        origin_y,
        data: vec![0.0; cells],
    };

    for (outlined, bounds) in outlines.iter().zip(&bounds) {
        let left = bounds.min.x as i64 - origin_x;
        let top = bounds.min.y as i64 - origin_y;
        outlined.draw(|px, py, coverage| {
            mask.accumulate(left + i64::from(px), top + i64::from(py), coverage);
        });
    }

    Ok(Some(mask))
}

/// Draw `text` onto `canvas` with its baseline origin at `origin`, rotated
/// counter-clockwise by `degrees`.
///
/// Pixels falling outside the canvas are skipped, so an off-canvas origin
/// simply draws nothing visible. Text without any outlined glyph (empty or
/// whitespace only) and non-positive sizes leave the canvas untouched.
///
/// # Errors
///
/// Fails when the unrotated label would need more than [`MAX_MASK_CELLS`]
/// coverage cells.
pub fn draw_text<F: Font>(
    canvas: &mut RgbaImage,
    font: &F,
    style: &TextStyle,
    origin: (f32, f32),
    degrees: f32,
    text: &str,
) -> Result<(), WatermarkError> {
    if !(style.px_size.is_finite() && style.px_size > 0.0) {
        tracing::debug!(px_size = style.px_size, "Skipping label with non-positive size");
        return Ok(());
    }

    let Some(mask) = rasterize(font, style.px_size, text)? else {
        return Ok(());
    };

    let (ox, oy) = origin;
    if degrees.rem_euclid(360.0) == 0.0 {
        let left = ox.round() as i64 + mask.origin_x;
        let top = oy.round() as i64 + mask.origin_y;
        // Only the mask cells landing on the canvas
        let cols = (-left).max(0)..(i64::from(canvas.width()) - left).min(mask.width as i64);
        let rows = (-top).max(0)..(i64::from(canvas.height()) - top).min(mask.height as i64);
        for my in rows {
            for mx in cols.clone() {
                blend_coverage(canvas, left + mx, top + my, style.color, mask.at(mx, my));
            }
        }
        return Ok(());
    }

    let radians = degrees.to_radians();
    let (sin, cos) = radians.sin_cos();

    // Forward map (canvas y grows downward): local (u, v) -> origin + (u cos + v sin, -u sin + v cos)
    let x0 = mask.origin_x as f32;
    let y0 = mask.origin_y as f32;
    let x1 = x0 + mask.width as f32;
    let y1 = y0 + mask.height as f32;
    let corners = [(x0, y0), (x1, y0), (x0, y1), (x1, y1)];
    let mapped: Vec<(f32, f32)> = corners
        .iter()
        .map(|&(u, v)| (ox + u * cos + v * sin, oy - u * sin + v * cos))
        .collect();

    let min_x = mapped.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
    let max_x = mapped.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
    let min_y = mapped.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
    let max_y = mapped.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);

    let start_x = (min_x.floor() as i64).max(0);
    let start_y = (min_y.floor() as i64).max(0);
    let end_x = (max_x.ceil() as i64).min(i64::from(canvas.width()));
    let end_y = (max_y.ceil() as i64).min(i64::from(canvas.height()));

    for py in start_y..end_y {
        for px in start_x..end_x {
            // Inverse map the pixel center back into label space
            let dx = px as f32 + 0.5 - ox;
            let dy = py as f32 + 0.5 - oy;
            let u = dx * cos - dy * sin;
            let v = dx * sin + dy * cos;
            blend_coverage(canvas, px, py, style.color, mask.sample(u, v));
        }
    }
    Ok(())
}

/// Blend `color` at `coverage` over one canvas pixel.
fn blend_coverage(canvas: &mut RgbaImage, x: i64, y: i64, color: Color, coverage: f32) {
    if coverage <= 0.0 {
        return;
    }
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return;
    };
    if x >= canvas.width() || y >= canvas.height() {
        return;
    }
    let top = Rgba([color.r, color.g, color.b, (coverage.min(1.0) * 255.0).round() as u8]);
    let pixel = canvas.get_pixel_mut(x, y);
    *pixel = blend_pixels(*pixel, top);
}

/// Blend two RGBA pixels using the Porter-Duff "over" operator.
fn blend_pixels(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    let top_alpha = top[3] as f32 / 255.0;
    let bottom_alpha = bottom[3] as f32 / 255.0;

    let out_alpha = top_alpha + bottom_alpha * (1.0 - top_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |t: u8, b: u8| -> u8 {
        let t = t as f32 / 255.0;
        let b = b as f32 / 255.0;
        let result = (t * top_alpha + b * bottom_alpha * (1.0 - top_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(top[0], bottom[0]),
        blend(top[1], bottom[1]),
        blend(top[2], bottom[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
