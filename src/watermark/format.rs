//! Raster format detection and the codec table.
//!
//! The format is read from the file header, never from the extension. Each
//! supported format maps to at most one [`Codec`]; a format this build can
//! recognize but not decode or encode maps to `None`.

use super::WatermarkError;
use image::codecs::bmp::BmpEncoder;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, ImageFormat, RgbaImage};
use std::io::Cursor;

/// JPEG quality used when re-encoding.
const JPEG_QUALITY: u8 = 75;

/// Raster formats the watermark engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RasterFormat {
    Avif,
    Bmp,
    Gif,
    Jpeg,
    Png,
    Wbmp,
    WebP,
}

/// Decoder/encoder pair for one format.
#[derive(Clone, Copy)]
pub struct Codec {
    pub decode: fn(&[u8]) -> Result<DynamicImage, WatermarkError>,
    pub encode: fn(&RgbaImage) -> Result<Vec<u8>, WatermarkError>,
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

impl RasterFormat {
    pub fn name(self) -> &'static str {
        match self {
            RasterFormat::Avif => "avif",
            RasterFormat::Bmp => "bmp",
            RasterFormat::Gif => "gif",
            RasterFormat::Jpeg => "jpeg",
            RasterFormat::Png => "png",
            RasterFormat::Wbmp => "wbmp",
            RasterFormat::WebP => "webp",
        }
    }

    /// Detect the format from the leading bytes of a file.
    pub fn detect(bytes: &[u8]) -> Result<Self, WatermarkError> {
        if is_avif(bytes) {
            return Ok(RasterFormat::Avif);
        }

        match image::guess_format(bytes) {
            Ok(ImageFormat::Png) => Ok(RasterFormat::Png),
            Ok(ImageFormat::Jpeg) => Ok(RasterFormat::Jpeg),
            Ok(ImageFormat::Gif) => Ok(RasterFormat::Gif),
            Ok(ImageFormat::WebP) => Ok(RasterFormat::WebP),
            Ok(ImageFormat::Bmp) => Ok(RasterFormat::Bmp),
            Ok(ImageFormat::Avif) => Ok(RasterFormat::Avif),
            Ok(other) => Err(WatermarkError::unsupported_image(format!(
                "{:?} images are not supported",
                other
            ))),
            Err(_) if is_wbmp(bytes) => Ok(RasterFormat::Wbmp),
            Err(_) => Err(WatermarkError::unsupported_image(
                "could not find image type",
            )),
        }
    }

    /// Codec for this format, or `None` when this build has none.
    pub fn codec(self) -> Option<Codec> {
        match self {
            RasterFormat::Png => Some(Codec {
                decode: decode_png,
                encode: encode_png,
            }),
            RasterFormat::Jpeg => Some(Codec {
                decode: decode_jpeg,
                encode: encode_jpeg,
            }),
            RasterFormat::Gif => Some(Codec {
                decode: decode_gif,
                encode: encode_gif,
            }),
            RasterFormat::WebP => Some(Codec {
                decode: decode_webp,
                encode: encode_webp,
            }),
            RasterFormat::Bmp => Some(Codec {
                decode: decode_bmp,
                encode: encode_bmp,
            }),
            RasterFormat::Avif | RasterFormat::Wbmp => None,
        }
    }

    /// Codec for this format, or `UnsupportedImageType`.
    pub fn require_codec(self) -> Result<Codec, WatermarkError> {
        self.codec().ok_or_else(|| {
            WatermarkError::unsupported_image(format!(
                "no {} codec available in this build",
                self.name()
            ))
        })
    }
}

/// ISO-BMFF `ftyp` box with an AVIF brand.
fn is_avif(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && matches!(&bytes[8..12], b"avif" | b"avis")
}

/// WBMP type 0: two zero header bytes, multi-byte width and height, then a
/// 1-bit bitmap whose length must match exactly.
fn is_wbmp(bytes: &[u8]) -> bool {
    fn read_multibyte(bytes: &[u8], pos: &mut usize) -> Option<u64> {
        let mut value = 0u64;
        for _ in 0..4 {
            let byte = *bytes.get(*pos)?;
            *pos += 1;
            value = (value << 7) | u64::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Some(value);
            }
        }
        None
    }

    if bytes.len() < 4 || bytes[0] != 0 || bytes[1] != 0 {
        return false;
    }
    let mut pos = 2;
    let (Some(width), Some(height)) = (
        read_multibyte(bytes, &mut pos),
        read_multibyte(bytes, &mut pos),
    ) else {
        return false;
    };
    width > 0 && height > 0 && (bytes.len() - pos) as u64 == (width + 7) / 8 * height
}

fn decode_as(bytes: &[u8], format: ImageFormat) -> Result<DynamicImage, WatermarkError> {
    image::load_from_memory_with_format(bytes, format)
        .map_err(|e| WatermarkError::failure(format!("decode {:?}", format), e))
}

fn decode_png(bytes: &[u8]) -> Result<DynamicImage, WatermarkError> {
    decode_as(bytes, ImageFormat::Png)
}

fn decode_jpeg(bytes: &[u8]) -> Result<DynamicImage, WatermarkError> {
    decode_as(bytes, ImageFormat::Jpeg)
}

fn decode_gif(bytes: &[u8]) -> Result<DynamicImage, WatermarkError> {
    decode_as(bytes, ImageFormat::Gif)
}

fn decode_webp(bytes: &[u8]) -> Result<DynamicImage, WatermarkError> {
    decode_as(bytes, ImageFormat::WebP)
}

fn decode_bmp(bytes: &[u8]) -> Result<DynamicImage, WatermarkError> {
    decode_as(bytes, ImageFormat::Bmp)
}

/// Drop the alpha channel for formats that cannot carry it.
fn flatten(image: &RgbaImage) -> image::RgbImage {
    DynamicImage::ImageRgba8(image.clone()).to_rgb8()
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    let mut output = Cursor::new(Vec::new());
    PngEncoder::new(&mut output)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| WatermarkError::failure("encode png", e))?;
    Ok(output.into_inner())
}

fn encode_jpeg(image: &RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    let rgb = flatten(image);
    let mut output = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut output, JPEG_QUALITY)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| WatermarkError::failure("encode jpeg", e))?;
    Ok(output.into_inner())
}

fn encode_gif(image: &RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    let mut output = Cursor::new(Vec::new());
    {
        let mut encoder = GifEncoder::new(&mut output);
        encoder
            .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
            .map_err(|e| WatermarkError::failure("encode gif", e))?;
    }
    Ok(output.into_inner())
}

fn encode_webp(image: &RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    let mut output = Cursor::new(Vec::new());
    WebPEncoder::new_lossless(&mut output)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| WatermarkError::failure("encode webp", e))?;
    Ok(output.into_inner())
}

fn encode_bmp(image: &RgbaImage) -> Result<Vec<u8>, WatermarkError> {
    let rgb = flatten(image);
    let mut output = Cursor::new(Vec::new());
    BmpEncoder::new(&mut output)
        .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|e| WatermarkError::failure("encode bmp", e))?;
    Ok(output.into_inner())
}
