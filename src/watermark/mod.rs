//! Text watermarking for PDF documents and raster images.
//!
//! A [`WatermarkRequest`] names a source file and a label. The [`Watermarker`]
//! writes a watermarked copy to a fresh file and never touches the source.
//!
//! # Features
//!
//! - **Vector backend**: every PDF page is re-authored with the original page
//!   as a Form XObject underneath and the label drawn on top
//! - **Raster backend**: BMP, GIF, JPEG, PNG and WebP, re-encoded in the
//!   source format
//! - **Edge-relative positioning**: negative coordinates are measured from the
//!   right or bottom edge
//! - **Rotation** counter-clockwise about the label's anchor, scoped per page
//!
//! # Backend Selection
//!
//! An explicit hint (`pdf`/`vector`, `img`/`image`/`raster`) wins. Without one,
//! a `.pdf` extension selects the vector backend and anything else the raster
//! backend. Unknown hints are rejected with
//! [`WatermarkError::InvalidBackendKind`].

pub mod error;
pub mod font;
pub mod format;
pub mod output;
pub mod position;
pub mod processor;
pub mod raster;
pub mod request;
pub mod rotation;
pub mod text_renderer;
pub mod vector;

// Re-export main types for convenience
pub use error::WatermarkError;
pub use font::{FontResolver, ResolvedFont};
pub use format::{Codec, RasterFormat};
pub use output::OutputArtifact;
pub use position::{resolve_position, Dimensions, ResolvedPosition};
pub use processor::Watermarker;
pub use raster::RasterCompositor;
pub use request::{BackendKind, WatermarkRequest, DEFAULT_FONT_SIZE};
pub use rotation::{AffineScopeRotation, DirectAngleRotation, RotationStrategy};
pub use text_renderer::{parse_hex_color, Color, TextStyle};
pub use vector::VectorCompositor;
