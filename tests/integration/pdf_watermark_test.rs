// Integration tests for the vector (PDF) backend
//
// Tests verify that:
// - Every page is stamped and keeps its size
// - Rotation is scoped per page and never accumulates
// - Corrupt input produces no output
// - Repeated calls produce independent, equivalent outputs

use crate::integration::test_harness::*;
use lopdf::Document;
use std::fs;
use watermark_engine::watermark::{BackendKind, WatermarkError, WatermarkRequest, Watermarker};

const LETTER: [i64; 4] = [0, 0, 612, 792];

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn test_three_page_draft_at_45_degrees() {
    let ws = Workspace::new();
    let source = ws.input_path("report.pdf");
    write_pdf(&source, &[LETTER, LETTER, LETTER]);

    let request = WatermarkRequest::new(&source, "DRAFT")
        .with_position(-20, -20)
        .with_angle(45);
    let artifact = Watermarker::new(ws.config()).apply(&request).unwrap();

    assert_eq!(artifact.kind, BackendKind::Vector);
    assert_eq!(artifact.path.extension().unwrap(), "pdf");
    assert_ne!(artifact.path, source);

    let doc = Document::load(&artifact.path).unwrap();
    assert_eq!(page_sizes(&doc), vec![(612.0, 792.0); 3]);

    let angle = 45f32.to_radians();
    for page_id in doc.get_pages().into_values() {
        let ops = page_ops(&doc, page_id);

        let td = operands(&ops, "Td");
        assert!(approx(td[0], 592.0));
        assert!(approx(td[1], 20.0));

        // Same rotation matrix on every page: nothing carried over
        let rotation: Vec<f32> = ops
            .iter()
            .filter(|op| op.operator == "cm")
            .nth(1)
            .unwrap()
            .operands
            .iter()
            .map(|o| o.as_float().unwrap())
            .collect();
        assert!(approx(rotation[0], angle.cos()));
        assert!(approx(rotation[1], angle.sin()));
        assert!(approx(rotation[2], -angle.sin()));
        assert!(approx(rotation[3], angle.cos()));

        let opens = ops.iter().filter(|op| op.operator == "q").count();
        let closes = ops.iter().filter(|op| op.operator == "Q").count();
        assert_eq!(opens, closes);
        assert_eq!(ops.last().unwrap().operator, "Q");
    }
}

#[test]
fn test_mixed_page_sizes_are_preserved() {
    let ws = Workspace::new();
    let source = ws.input_path("mixed.pdf");
    write_pdf(&source, &[LETTER, [0, 0, 842, 595], [0, 0, 298, 420]]);

    let request = WatermarkRequest::new(&source, "COPY").with_position(10, 10);
    let artifact = Watermarker::new(ws.config()).apply(&request).unwrap();

    let doc = Document::load(&artifact.path).unwrap();
    assert_eq!(
        page_sizes(&doc),
        vec![(612.0, 792.0), (842.0, 595.0), (298.0, 420.0)]
    );

    // Baseline is measured against each page's own height
    let baselines: Vec<f32> = doc
        .get_pages()
        .into_values()
        .map(|id| operands(&page_ops(&doc, id), "Td")[1])
        .collect();
    assert_eq!(baselines, vec![782.0, 585.0, 410.0]);
}

#[test]
fn test_zero_angle_is_identity() {
    let ws = Workspace::new();
    let source = ws.input_path("flat.pdf");
    write_pdf(&source, &[LETTER]);

    let request = WatermarkRequest::new(&source, "FLAT").with_position(100, 100);
    let artifact = Watermarker::new(ws.config()).apply(&request).unwrap();

    let doc = Document::load(&artifact.path).unwrap();
    let page = *doc.get_pages().get(&1).unwrap();
    let ops = page_ops(&doc, page);
    let matrix: Vec<f32> = ops
        .iter()
        .filter(|op| op.operator == "cm")
        .nth(1)
        .unwrap()
        .operands
        .iter()
        .take(4)
        .map(|o| o.as_float().unwrap())
        .collect();
    assert_eq!(matrix, vec![1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn test_original_content_is_kept_under_label() {
    let ws = Workspace::new();
    let source = ws.input_path("content.pdf");
    write_pdf(&source, &[LETTER, LETTER]);

    let request = WatermarkRequest::new(&source, "DRAFT");
    let artifact = Watermarker::new(ws.config()).apply(&request).unwrap();
    let doc = Document::load(&artifact.path).unwrap();

    let pages: Vec<_> = doc.get_pages().into_values().collect();
    for (i, page_id) in pages.into_iter().enumerate() {
        let ops = page_ops(&doc, page_id);
        let draw = ops.iter().position(|op| op.operator == "Do").unwrap();
        let text = ops.iter().position(|op| op.operator == "Tj").unwrap();
        assert!(draw < text, "template must be drawn before the label");

        let name = ops[draw].operands[0].as_name().unwrap().to_vec();
        let xobjects = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Resources")
            .and_then(lopdf::Object::as_dict)
            .and_then(|r| r.get(b"XObject"))
            .and_then(lopdf::Object::as_dict)
            .unwrap();
        let template_id = xobjects
            .get(&name)
            .and_then(lopdf::Object::as_reference)
            .unwrap();
        let template = doc
            .get_object(template_id)
            .and_then(lopdf::Object::as_stream)
            .unwrap();
        let body = template.decompressed_content().unwrap_or_else(|_| template.content.clone());
        assert!(String::from_utf8_lossy(&body).contains(&format!("page {}", i + 1)));
    }
}

#[test]
fn test_source_is_not_modified() {
    let ws = Workspace::new();
    let source = ws.input_path("keep.pdf");
    write_pdf(&source, &[LETTER]);
    let before = fs::read(&source).unwrap();

    let request = WatermarkRequest::new(&source, "DRAFT").with_angle(30);
    Watermarker::new(ws.config()).apply(&request).unwrap();

    assert_eq!(fs::read(&source).unwrap(), before);
}

#[test]
fn test_repeated_calls_are_independent_and_equivalent() {
    let ws = Workspace::new();
    let source = ws.input_path("twice.pdf");
    write_pdf(&source, &[LETTER, [0, 0, 842, 595]]);

    let watermarker = Watermarker::new(ws.config());
    let request = WatermarkRequest::new(&source, "DRAFT")
        .with_position(-20, -20)
        .with_angle(45);
    let first = watermarker.apply(&request).unwrap();
    let second = watermarker.apply(&request).unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(ws.output_count(), 2);

    let a = Document::load(&first.path).unwrap();
    let b = Document::load(&second.path).unwrap();
    assert_eq!(page_sizes(&a), page_sizes(&b));
    for (pa, pb) in a.get_pages().into_values().zip(b.get_pages().into_values()) {
        assert_eq!(
            a.get_page_content(pa).unwrap(),
            b.get_page_content(pb).unwrap()
        );
    }
}

#[test]
fn test_corrupt_pdf_is_parse_failure_without_output() {
    let ws = Workspace::new();
    let source = ws.input_path("broken.pdf");
    fs::write(&source, b"%PDF-1.4\nthis is not a real document").unwrap();

    let err = Watermarker::new(ws.config())
        .apply(&WatermarkRequest::new(&source, "DRAFT"))
        .unwrap_err();
    assert!(matches!(err, WatermarkError::DocumentParseFailure(_)));
    assert_eq!(ws.output_count(), 0);
}

#[test]
fn test_document_without_pages() {
    let ws = Workspace::new();
    let source = ws.input_path("empty.pdf");
    write_pdf(&source, &[]);

    let artifact = Watermarker::new(ws.config())
        .apply(&WatermarkRequest::new(&source, "DRAFT"))
        .unwrap();
    let doc = Document::load(&artifact.path).unwrap();
    assert!(doc.get_pages().is_empty());
}
