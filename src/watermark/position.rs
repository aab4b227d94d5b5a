//! Position resolution for watermark placement.
//!
//! Callers give an `(x, y)` pair relative to the top-left corner of the target.
//! A negative coordinate is an offset from the far edge instead: `x = -10`
//! places the anchor 10 units left of the right edge, `y = -10` 10 units above
//! the bottom edge.
//!
//! # Example
//!
//! ```
//! use watermark_engine::watermark::position::{resolve_position, Dimensions, ResolvedPosition};
//!
//! let page = Dimensions::new(800.0, 600.0);
//! let pos = resolve_position(-50, 20, &page, 1.0);
//! assert_eq!(pos, ResolvedPosition::new(750.0, 20.0));
//! ```

/// Width and height of a page (points) or an image (pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width as f32, height as f32)
    }
}

/// Absolute anchor of the label in top-left-origin target space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPosition {
    pub x: f32,
    pub y: f32,
}

impl ResolvedPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Resolve a caller-given position against the target's dimensions.
///
/// `scale` converts caller units into target units and is applied before the
/// sign check. The vector backend passes `1.0`; the raster backend passes its
/// configured unit scale.
///
/// Offsets larger than the target are not rejected: the result lies outside
/// the canvas and the label is drawn where it cannot be seen.
pub fn resolve_position(x: i32, y: i32, target: &Dimensions, scale: f32) -> ResolvedPosition {
    ResolvedPosition::new(
        resolve_axis(x as f32 * scale, target.width),
        resolve_axis(y as f32 * scale, target.height),
    )
}

fn resolve_axis(value: f32, extent: f32) -> f32 {
    if value < 0.0 {
        extent + value
    } else {
        value
    }
}

/// Check if an anchor falls inside the target.
pub fn is_inside(pos: &ResolvedPosition, target: &Dimensions) -> bool {
    pos.x >= 0.0 && pos.y >= 0.0 && pos.x < target.width && pos.y < target.height
}
