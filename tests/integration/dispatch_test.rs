// Integration tests for backend selection and input validation

use crate::integration::test_harness::*;
use image::ImageFormat;
use lopdf::Document;
use std::sync::Arc;
use std::thread;
use watermark_engine::watermark::{BackendKind, WatermarkError, WatermarkRequest, Watermarker};

#[test]
fn test_unreadable_input_is_reported_first() {
    let ws = Workspace::new();
    // Invalid hint too: readability is checked before anything else
    let request = WatermarkRequest::new(ws.input_path("nowhere.png"), "x").with_backend("svg");

    let err = Watermarker::new(ws.config()).apply(&request).unwrap_err();
    match err {
        WatermarkError::InputUnreadable { path, .. } => assert!(path.ends_with("nowhere.png")),
        other => panic!("expected InputUnreadable, got {:?}", other),
    }
    assert_eq!(ws.output_count(), 0);
}

#[test]
fn test_directory_source_is_unreadable() {
    let ws = Workspace::new();
    let source = ws.input_path("folder.png");
    std::fs::create_dir(&source).unwrap();

    let err = Watermarker::new(ws.config())
        .apply(&WatermarkRequest::new(&source, "x"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::InputUnreadable { .. }));
    assert_eq!(ws.output_count(), 0);
}

#[test]
fn test_unknown_backend_hint_is_rejected() {
    let ws = Workspace::new();
    let source = ws.input_path("photo.png");
    write_image(&source, 20, 20, ImageFormat::Png);

    let request = WatermarkRequest::new(&source, "x").with_backend("postscript");
    let err = Watermarker::new(ws.config()).apply(&request).unwrap_err();
    assert!(matches!(err, WatermarkError::InvalidBackendKind(hint) if hint == "postscript"));
    assert_eq!(ws.output_count(), 0);
}

#[test]
fn test_pdf_hint_overrides_extension() {
    let ws = Workspace::new();
    let source = ws.input_path("document.bin");
    write_pdf(&source, &[[0, 0, 612, 792]]);

    let request = WatermarkRequest::new(&source, "DRAFT").with_backend("pdf");
    let artifact = Watermarker::new(ws.config()).apply(&request).unwrap();

    assert_eq!(artifact.kind, BackendKind::Vector);
    assert_eq!(artifact.path.extension().unwrap(), "bin");
    assert_eq!(Document::load(&artifact.path).unwrap().get_pages().len(), 1);
}

#[test]
fn test_uppercase_pdf_extension_selects_vector() {
    let ws = Workspace::new();
    let source = ws.input_path("REPORT.PDF");
    write_pdf(&source, &[[0, 0, 612, 792]]);

    let artifact = Watermarker::new(ws.config())
        .apply(&WatermarkRequest::new(&source, "DRAFT"))
        .unwrap();
    assert_eq!(artifact.kind, BackendKind::Vector);
    assert_eq!(artifact.path.extension().unwrap(), "pdf");
}

#[test]
fn test_pdf_bytes_on_raster_backend_are_unsupported() {
    let ws = Workspace::new();
    let source = ws.input_path("misnamed.png");
    write_pdf(&source, &[[0, 0, 612, 792]]);

    let err = Watermarker::new(ws.config())
        .apply(&WatermarkRequest::new(&source, "x"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::UnsupportedImageType(_)));
    assert_eq!(ws.output_count(), 0);
}

#[test]
fn test_shared_watermarker_across_threads() {
    let ws = Workspace::new();
    let pdf = ws.input_path("shared.pdf");
    let png = ws.input_path("shared.png");
    write_pdf(&pdf, &[[0, 0, 612, 792], [0, 0, 612, 792]]);
    write_image(&png, 120, 90, ImageFormat::Png);

    let watermarker = Arc::new(Watermarker::new(ws.config()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let watermarker = Arc::clone(&watermarker);
            let source = if i % 2 == 0 { pdf.clone() } else { png.clone() };
            thread::spawn(move || {
                let request = WatermarkRequest::new(source, format!("copy {}", i)).with_angle(15);
                watermarker.apply(&request).unwrap()
            })
        })
        .collect();

    let mut paths: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().path)
        .collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 4);
    assert_eq!(ws.output_count(), 4);
}
