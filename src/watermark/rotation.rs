//! Rotation of the watermark label about its anchor.
//!
//! The two backends rotate text through structurally different primitives:
//!
//! - **Vector**: a graphics-state scope (`q` … `Q`) holding a `cm` rotation
//!   matrix recentered on the anchor, inside which the label is drawn unrotated.
//! - **Raster**: the text primitive takes the angle directly.
//!
//! Both are expressed through [`RotationStrategy`]: a compositor hands the
//! strategy its draw target and a draw closure, and the strategy decides whether
//! to open a scope or pass the angle through.

use super::WatermarkError;
use image::RgbaImage;
use lopdf::content::Operation;

/// Capability to run one label draw call under a rotation.
pub trait RotationStrategy {
    /// What the draw closure writes into.
    type Target;

    /// Run `draw` rotated. The closure receives the target and the angle in
    /// degrees it must pass to its own text primitive (zero when the strategy
    /// already rotated the coordinate system).
    fn apply_rotated<F>(&self, target: &mut Self::Target, draw: F) -> Result<(), WatermarkError>
    where
        F: FnOnce(&mut Self::Target, f32) -> Result<(), WatermarkError>;
}

/// Rotation as an affine `cm` inside a `q`/`Q` scope, centered on the anchor.
///
/// The anchor is in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineScopeRotation {
    cos: f32,
    sin: f32,
    anchor_x: f32,
    anchor_y: f32,
}

impl AffineScopeRotation {
    pub fn new(degrees: i32, anchor_x: f32, anchor_y: f32) -> Self {
        let radians = (degrees as f32).to_radians();
        Self {
            cos: radians.cos(),
            sin: radians.sin(),
            anchor_x,
            anchor_y,
        }
    }

    /// The 2x2 part of the rotation matrix: `(cos, sin, -sin, cos)`.
    pub fn matrix(&self) -> [f32; 4] {
        [self.cos, self.sin, -self.sin, self.cos]
    }

    pub fn is_identity(&self) -> bool {
        self.sin == 0.0 && self.cos == 1.0
    }

    /// Operations that open the scope: save state, rotate about the anchor.
    fn enter_ops(&self) -> [Operation; 3] {
        let [a, b, c, d] = self.matrix();
        [
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    a.into(),
                    b.into(),
                    c.into(),
                    d.into(),
                    self.anchor_x.into(),
                    self.anchor_y.into(),
                ],
            ),
            Operation::new(
                "cm",
                vec![
                    1.into(),
                    0.into(),
                    0.into(),
                    1.into(),
                    (-self.anchor_x).into(),
                    (-self.anchor_y).into(),
                ],
            ),
        ]
    }
}

impl RotationStrategy for AffineScopeRotation {
    type Target = Vec<Operation>;

    fn apply_rotated<F>(&self, target: &mut Self::Target, draw: F) -> Result<(), WatermarkError>
    where
        F: FnOnce(&mut Self::Target, f32) -> Result<(), WatermarkError>,
    {
        target.extend(self.enter_ops());
        let drawn = draw(target, 0.0);
        // Close the scope even when drawing failed so the stream stays balanced.
        target.push(Operation::new("Q", vec![]));
        drawn
    }
}

/// Rotation passed straight to the raster text primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectAngleRotation {
    degrees: f32,
}

impl DirectAngleRotation {
    pub fn new(degrees: i32) -> Self {
        Self {
            degrees: degrees as f32,
        }
    }

    pub fn degrees(&self) -> f32 {
        self.degrees
    }
}

impl RotationStrategy for DirectAngleRotation {
    type Target = RgbaImage;

    fn apply_rotated<F>(&self, target: &mut Self::Target, draw: F) -> Result<(), WatermarkError>
    where
        F: FnOnce(&mut Self::Target, f32) -> Result<(), WatermarkError>,
    {
        draw(target, self.degrees)
    }
}
