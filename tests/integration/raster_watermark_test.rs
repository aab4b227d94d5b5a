// Integration tests for the raster backend

use crate::integration::test_harness::*;
use image::ImageFormat;
use rstest::rstest;
use std::fs;
use watermark_engine::watermark::{BackendKind, WatermarkError, WatermarkRequest, Watermarker};

#[test]
fn test_png_copyright_in_red() {
    let ws = Workspace::new();
    let source = ws.input_path("photo.png");
    write_image(&source, 640, 480, ImageFormat::Png);

    let request = WatermarkRequest::new(&source, "© 2024")
        .with_position(10, 10)
        .with_color([255, 0, 0]);
    let artifact = Watermarker::new(ws.config()).apply(&request).unwrap();

    assert_eq!(artifact.kind, BackendKind::Raster);
    assert_eq!(artifact.path.extension().unwrap(), "png");
    assert_eq!(
        image::guess_format(&fs::read(&artifact.path).unwrap()).unwrap(),
        ImageFormat::Png
    );

    let out = read_image(&artifact.path);
    assert_eq!(out.dimensions(), (640, 480));

    let inked = inked_pixels(&out);
    assert!(!inked.is_empty());
    // Red over white only ever lowers green and blue
    assert!(inked.iter().all(|(_, _, p)| p[0] == 255 && p[1] == p[2]));
    // Baseline sits at 10 * 72 / 25.4 ≈ 28px; nothing far below or left of it
    assert!(inked.iter().all(|(x, y, _)| *y < 40 && *x > 20));
}

#[rstest]
#[case("photo.jpg", ImageFormat::Jpeg)]
#[case("photo.gif", ImageFormat::Gif)]
#[case("photo.bmp", ImageFormat::Bmp)]
#[case("photo.webp", ImageFormat::WebP)]
fn test_format_and_dimensions_preserved(#[case] name: &str, #[case] format: ImageFormat) {
    let ws = Workspace::new();
    let source = ws.input_path(name);
    write_image(&source, 321, 123, format);

    let request = WatermarkRequest::new(&source, "Sample").with_position(-60, -10);
    let artifact = Watermarker::new(ws.config()).apply(&request).unwrap();

    let bytes = fs::read(&artifact.path).unwrap();
    assert_eq!(image::guess_format(&bytes).unwrap(), format);
    assert_eq!(read_image(&artifact.path).dimensions(), (321, 123));
}

#[test]
fn test_rotation_is_counter_clockwise() {
    let ws = Workspace::new();
    let source = ws.input_path("square.png");
    write_image(&source, 200, 200, ImageFormat::Png);

    let config = watermark_engine::config::WatermarkConfig {
        raster_unit_scale: 1.0,
        ..ws.config()
    };
    let request = WatermarkRequest::new(&source, "HHHH")
        .with_position(100, 150)
        .with_angle(90)
        .with_color([0, 0, 0]);
    let artifact = Watermarker::new(config).apply(&request).unwrap();

    let inked = inked_pixels(&read_image(&artifact.path));
    assert!(!inked.is_empty());
    // Text runs upward from the anchor, glyph tops point left
    assert!(inked.iter().all(|(x, y, _)| *x <= 102 && *y <= 152));
    let min_y = inked.iter().map(|(_, y, _)| *y).min().unwrap();
    assert!(min_y < 120, "text should extend well above the anchor");
}

#[test]
fn test_tiff_is_rejected_without_output() {
    let ws = Workspace::new();
    let source = ws.input_path("scan.tiff");
    fs::write(&source, b"II*\0\x08\0\0\0\0\0\0\0\0\0\0\0").unwrap();

    let err = Watermarker::new(ws.config())
        .apply(&WatermarkRequest::new(&source, "x"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::UnsupportedImageType(_)));
    assert_eq!(ws.output_count(), 0);
}

#[test]
fn test_missing_font_family_is_rejected_without_output() {
    let ws = Workspace::new();
    let source = ws.input_path("photo.png");
    write_image(&source, 64, 64, ImageFormat::Png);

    let request = WatermarkRequest::new(&source, "x").with_font_family("NoSuchFamily");
    let err = Watermarker::new(ws.config()).apply(&request).unwrap_err();
    assert!(matches!(err, WatermarkError::FontNotFound(_)));
    assert_eq!(ws.output_count(), 0);
}

#[test]
fn test_source_is_not_modified() {
    let ws = Workspace::new();
    let source = ws.input_path("keep.png");
    write_image(&source, 120, 80, ImageFormat::Png);
    let before = fs::read(&source).unwrap();

    let request = WatermarkRequest::new(&source, "Mark").with_position(2, 10);
    Watermarker::new(ws.config()).apply(&request).unwrap();

    assert_eq!(fs::read(&source).unwrap(), before);
}

#[test]
fn test_repeated_calls_give_identical_pixels() {
    let ws = Workspace::new();
    let source = ws.input_path("twice.png");
    write_image(&source, 200, 100, ImageFormat::Png);

    let watermarker = Watermarker::new(ws.config());
    let request = WatermarkRequest::new(&source, "Again")
        .with_position(5, 20)
        .with_angle(30);
    let first = watermarker.apply(&request).unwrap();
    let second = watermarker.apply(&request).unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(read_image(&first.path), read_image(&second.path));
}

#[test]
fn test_image_with_pdf_extension_and_image_hint() {
    let ws = Workspace::new();
    let source = ws.input_path("looks-like.pdf");
    write_image(&source, 50, 40, ImageFormat::Png);

    let request = WatermarkRequest::new(&source, "x").with_backend("img");
    let artifact = Watermarker::new(ws.config()).apply(&request).unwrap();

    assert_eq!(artifact.kind, BackendKind::Raster);
    assert_eq!(artifact.path.extension().unwrap(), "pdf");
    assert_eq!(read_image(&artifact.path).dimensions(), (50, 40));
}

#[test]
fn test_oversized_font_is_failure_without_output() {
    let ws = Workspace::new();
    let source = ws.input_path("small.png");
    write_image(&source, 64, 64, ImageFormat::Png);

    let request = WatermarkRequest::new(&source, "DRAFT DRAFT DRAFT").with_font_size(40000);
    let err = Watermarker::new(ws.config()).apply(&request).unwrap_err();
    assert!(matches!(err, WatermarkError::WatermarkFailure { .. }));
    assert_eq!(ws.output_count(), 0);
}

#[test]
fn test_negative_font_size_leaves_image_blank() {
    let ws = Workspace::new();
    let source = ws.input_path("small.png");
    write_image(&source, 64, 64, ImageFormat::Png);

    let request = WatermarkRequest::new(&source, "DRAFT")
        .with_font_size(-20)
        .with_angle(30);
    let artifact = Watermarker::new(ws.config()).apply(&request).unwrap();

    let out = read_image(&artifact.path);
    assert_eq!(out.dimensions(), (64, 64));
    assert!(inked_pixels(&out).is_empty());
}
