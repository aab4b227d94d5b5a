//! Vector page compositor for PDF documents.
//!
//! Each source page is imported as a Form XObject template and drawn onto a
//! fresh page of the same size. The label is then written on top inside its own
//! graphics-state scope, so the rotation of one page never leaks into the next.
//!
//! # Page layout
//!
//! ```text
//! q 1 0 0 1 -llx -lly cm /Tpl0 Do Q
//! r g b rg
//! q cos sin -sin cos cx cy cm 1 0 0 1 -cx -cy cm
//!   BT /WmF size Tf x (h-y) Td (text) Tj ET
//! Q
//! ```

use super::output::write_atomic;
use super::position::{resolve_position, Dimensions};
use super::rotation::{AffineScopeRotation, RotationStrategy};
use super::text_renderer::Color;
use super::{WatermarkError, WatermarkRequest};
use crate::config::WatermarkConfig;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;

/// Resource name of the label font on every generated page.
const FONT_RESOURCE: &str = "WmF";

/// Page size used when neither the page nor its ancestors carry a MediaBox.
const US_LETTER: PageBox = PageBox {
    llx: 0.0,
    lly: 0.0,
    urx: 612.0,
    ury: 792.0,
};

/// Parent chains longer than this are treated as cyclic.
const MAX_TREE_DEPTH: usize = 64;

/// A page rectangle in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    fn from_object(doc: &Document, object: &Object) -> Option<Self> {
        let values = resolve(doc, object).as_array().ok()?;
        if values.len() != 4 {
            return None;
        }
        let mut n = [0.0f32; 4];
        for (slot, value) in n.iter_mut().zip(values) {
            *slot = resolve(doc, value).as_float().ok()?;
        }
        Some(Self {
            llx: n[0].min(n[2]),
            lly: n[1].min(n[3]),
            urx: n[0].max(n[2]),
            ury: n[1].max(n[3]),
        })
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    fn to_object(self) -> Object {
        Object::Array(vec![
            self.llx.into(),
            self.lly.into(),
            self.urx.into(),
            self.ury.into(),
        ])
    }
}

/// Summary of a finished document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    /// Sizes of the generated pages, in order.
    pub pages: Vec<Dimensions>,
}

/// Stamps a label on every page of a PDF.
#[derive(Debug, Clone)]
pub struct VectorCompositor<'a> {
    config: &'a WatermarkConfig,
}

impl<'a> VectorCompositor<'a> {
    pub fn new(config: &'a WatermarkConfig) -> Self {
        Self { config }
    }

    /// Watermark the PDF at `request.source` and save it to `output`.
    pub fn composite(
        &self,
        request: &WatermarkRequest,
        output: &Path,
    ) -> Result<RenderedDocument, WatermarkError> {
        let mut doc = Document::load(&request.source)
            .map_err(|e| WatermarkError::DocumentParseFailure(e.to_string()))?;

        let rendered = self.render(&mut doc, request)?;

        write_atomic(output, |file| {
            doc.save_to(file)
                .map_err(|e| WatermarkError::failure("save document", e))
        })?;

        tracing::debug!(
            output = %output.display(),
            pages = rendered.pages.len(),
            "Wrote watermarked document"
        );
        Ok(rendered)
    }

    /// Rebuild the page tree of `doc` with the label stamped on every page.
    pub fn render(
        &self,
        doc: &mut Document,
        request: &WatermarkRequest,
    ) -> Result<RenderedDocument, WatermarkError> {
        let pages_root = page_tree_root(doc)?;
        let source_pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

        let family = request.font_family_or_default(self.config);
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => standard_font_for(family),
            "Encoding" => "WinAnsiEncoding",
        });
        let color = request.color_or_default(self.config);

        let mut kids = Vec::with_capacity(source_pages.len());
        let mut sizes = Vec::with_capacity(source_pages.len());

        for (index, page_id) in source_pages.into_iter().enumerate() {
            let template = import_page(doc, page_id)?;
            let size = Dimensions::new(template.media_box.width(), template.media_box.height());
            let template_name = format!("Tpl{}", index);
            let template_id = doc.add_object(template.stream);

            let ops = page_operations(
                &template_name,
                &template.media_box,
                &size,
                request,
                color,
            )?;
            let content = Content { operations: ops }
                .encode()
                .map_err(|e| WatermarkError::failure(format!("encode page {}", index + 1), e))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

            let mut xobjects = Dictionary::new();
            xobjects.set(template_name.as_bytes().to_vec(), template_id);

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_root,
                "MediaBox" => PageBox {
                    llx: 0.0,
                    lly: 0.0,
                    urx: size.width,
                    ury: size.height,
                }
                .to_object(),
                "Resources" => dictionary! {
                    "XObject" => xobjects,
                    "Font" => dictionary! { FONT_RESOURCE => font_id },
                },
                "Contents" => content_id,
            });

            tracing::debug!(
                page = index + 1,
                width = size.width,
                height = size.height,
                "Stamped page"
            );
            kids.push(Object::Reference(page_id));
            sizes.push(size);
        }

        let root = doc
            .get_object_mut(pages_root)
            .and_then(Object::as_dict_mut)
            .map_err(|e| WatermarkError::failure("page tree root", e))?;
        root.set("Count", kids.len() as i64);
        root.set("Kids", Object::Array(kids));

        doc.prune_objects();
        Ok(RenderedDocument { pages: sizes })
    }
}

/// A source page turned into a Form XObject.
struct ImportedPage {
    media_box: PageBox,
    stream: Stream,
}

fn import_page(doc: &Document, page_id: ObjectId) -> Result<ImportedPage, WatermarkError> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|mb| PageBox::from_object(doc, &mb))
        .unwrap_or(US_LETTER);

    // Pages without Contents are blank
    let content = match doc.get_dictionary(page_id) {
        Ok(page) if page.has(b"Contents") => doc
            .get_page_content(page_id)
            .map_err(|e| WatermarkError::failure(format!("read page {:?} content", page_id), e))?,
        _ => Vec::new(),
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => media_box.to_object(),
    };
    if let Some(resources) = inherited_attribute(doc, page_id, b"Resources") {
        dict.set("Resources", resources);
    }

    Ok(ImportedPage {
        media_box,
        stream: Stream::new(dict, content),
    })
}

/// Content operations of one generated page.
fn page_operations(
    template_name: &str,
    media_box: &PageBox,
    size: &Dimensions,
    request: &WatermarkRequest,
    color: Color,
) -> Result<Vec<Operation>, WatermarkError> {
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                (-media_box.llx).into(),
                (-media_box.lly).into(),
            ],
        ),
        Operation::new("Do", vec![template_name.into()]),
        Operation::new("Q", vec![]),
    ];

    let [r, g, b] = color.to_unit_rgb();
    ops.push(Operation::new("rg", vec![r.into(), g.into(), b.into()]));

    let position = resolve_position(request.x, request.y, size, 1.0);
    // Flip against this page's own height so the baseline origin, and the
    // pivot of the rotation below, sit at the requested point on every page
    // size. A fixed nominal height would shift labels on non-Letter pages.
    let baseline_y = size.height - position.y;
    let text = encode_win_ansi(&request.text);
    let font_size = request.font_size as f32;

    AffineScopeRotation::new(request.angle, position.x, baseline_y).apply_rotated(
        &mut ops,
        |ops, _| {
            ops.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec![FONT_RESOURCE.into(), font_size.into()]),
                Operation::new("Td", vec![position.x.into(), baseline_y.into()]),
                Operation::new("Tj", vec![Object::String(text, StringFormat::Literal)]),
                Operation::new("ET", vec![]),
            ]);
            Ok(())
        },
    )?;

    Ok(ops)
}

/// The standard 14 bold face closest to a font family name.
pub fn standard_font_for(family: &str) -> &'static str {
    let family = family.to_lowercase();
    if family.contains("mono") || family.contains("courier") {
        "Courier-Bold"
    } else if family.contains("sans") || family.contains("helvetica") || family.contains("arial") {
        "Helvetica-Bold"
    } else {
        "Times-Bold"
    }
}

/// Encode text as WinAnsi (CP1252). Unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => {
                tracing::warn!(character = %c, "Character has no WinAnsi encoding, using '?'");
                b'?'
            }
        })
        .collect()
}

fn page_tree_root(doc: &Document) -> Result<ObjectId, WatermarkError> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|root| doc.get_dictionary(root))
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| WatermarkError::DocumentParseFailure(format!("no page tree: {}", e)))
}

/// Look `key` up on the page, then on each ancestor in the page tree.
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value).clone());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Follow one level of indirection.
fn resolve<'d>(doc: &'d Document, object: &'d Object) -> &'d Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}
