mod options;
mod perspective;
mod rotate;
mod scale;
mod unified;

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::geometry::{ContentBounds, Point, Singular, TransformMatrix};
use crate::handles::{self, BoundingQuad, HandleSet, HandleSize, ViewTransform};

pub use crate::handles::{GridFeatures, TransformFunction};
pub use options::{ConstrainFlags, FromPivotFlags, TransformOptions};
pub use perspective::PerspectiveTransform;
pub use rotate::RotateTransform;
pub use scale::ScaleTransform;
pub use unified::UnifiedTransform;

pub const TRANS_INFO_SIZE: usize = 10;

/// Kind-specific parameter slots; the meaning of each slot belongs to the
/// transform kind that prepared them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransformParameters([f64; TRANS_INFO_SIZE]);

impl TransformParameters {
    pub const fn from_slots(slots: [f64; TRANS_INFO_SIZE]) -> Self {
        Self(slots)
    }

    pub const fn slots(&self) -> &[f64; TRANS_INFO_SIZE] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|slot| slot.is_finite())
    }
}

impl Index<usize> for TransformParameters {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl IndexMut<usize> for TransformParameters {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

/// Pointer motion handed to a transform kind while a handle is dragged.
#[derive(Debug, Clone, Copy)]
pub struct MotionContext<'a> {
    pub function: TransformFunction,
    /// Parameters as they were when the button went down.
    pub start: &'a TransformParameters,
    /// Pointer position at button press, in image coordinates.
    pub origin: Point,
    pub current: Point,
    pub bounds: &'a ContentBounds,
    pub options: &'a TransformOptions,
    /// Snapping distance in image units, half a handle on screen.
    pub snap_radius: f64,
}

impl MotionContext<'_> {
    pub fn delta(&self) -> (f64, f64) {
        (self.current.x - self.origin.x, self.current.y - self.origin.y)
    }
}

/// Strategy turning pointer motion into parameters and parameters into a
/// matrix for one family of transforms.
pub trait TransformKind: fmt::Debug {
    fn tool_kind(&self) -> ToolKind;

    fn features(&self) -> GridFeatures;

    /// Initial parameters for freshly read content bounds.
    fn prepare(&self, bounds: &ContentBounds) -> TransformParameters;

    /// Updates `params` for a drag of `motion.function`. Functions the kind
    /// does not handle leave `params` untouched.
    fn on_motion(&self, params: &mut TransformParameters, motion: &MotionContext<'_>);

    fn recalc_matrix(
        &self,
        params: &TransformParameters,
        bounds: &ContentBounds,
    ) -> Result<TransformMatrix, Singular>;

    /// Pivot in image coordinates. Not transformed by the matrix.
    fn pivot(&self, params: &TransformParameters, bounds: &ContentBounds) -> Point {
        let _ = params;
        bounds.center()
    }

    fn pick_function(
        &self,
        pointer: Point,
        quad: &BoundingQuad,
        handles: &HandleSet,
        view: &ViewTransform,
    ) -> TransformFunction {
        handles::pick_function(pointer, quad, handles, view, self.features())
    }

    /// Function used when a press resolves to no handle.
    fn free_drag(&self) -> Option<TransformFunction> {
        None
    }

    fn draw_gui(&self, quad: &BoundingQuad, size: HandleSize) -> HandleSet {
        HandleSet::build(quad, size, self.features())
    }

    fn undo_description(&self, params: &TransformParameters) -> String;

    fn progress_label(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Scale,
    Rotate,
    Perspective,
    Unified,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [Self::Scale, Self::Rotate, Self::Perspective, Self::Unified];

    pub fn create(self) -> Box<dyn TransformKind> {
        match self {
            Self::Scale => Box::new(ScaleTransform),
            Self::Rotate => Box::new(RotateTransform),
            Self::Perspective => Box::new(PerspectiveTransform),
            Self::Unified => Box::new(UnifiedTransform),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Scale => "Scale",
            Self::Rotate => "Rotate",
            Self::Perspective => "Perspective",
            Self::Unified => "Unified Transform",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Axis-locks a delta to whichever component is larger.
pub(crate) fn dominant_axis(dx: f64, dy: f64) -> (f64, f64) {
    if dx.abs() >= dy.abs() {
        (dx, 0.0)
    } else {
        (0.0, dy)
    }
}

pub(crate) fn quad_corners(params: &TransformParameters) -> [Point; 4] {
    [0, 1, 2, 3].map(|corner| Point::new(params[corner * 2], params[corner * 2 + 1]))
}

pub(crate) fn store_quad_corners(params: &mut TransformParameters, corners: &[Point; 4]) {
    for (index, corner) in corners.iter().enumerate() {
        params[index * 2] = corner.x;
        params[index * 2 + 1] = corner.y;
    }
}
