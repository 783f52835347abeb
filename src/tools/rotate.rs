use std::f64::consts::{PI, TAU};

use super::{MotionContext, ToolKind, TransformKind, TransformParameters};
use crate::geometry::{ContentBounds, Point, Singular, TransformMatrix};
use crate::handles::{GridFeatures, TransformFunction};

const ANGLE: usize = 0;
const PIVOT_X: usize = 1;
const PIVOT_Y: usize = 2;

pub(crate) const SNAP_ANGLE: f64 = PI / 12.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct RotateTransform;

impl RotateTransform {
    pub fn parameters(angle: f64, pivot: Point) -> TransformParameters {
        let mut params = TransformParameters::default();
        params[ANGLE] = normalize_angle(angle);
        params[PIVOT_X] = pivot.x;
        params[PIVOT_Y] = pivot.y;
        params
    }
}

/// Wraps into `(-PI, PI]`.
pub(crate) fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle % TAU;
    if wrapped > PI {
        wrapped - TAU
    } else if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

pub(crate) fn snap_angle(angle: f64) -> f64 {
    (angle / SNAP_ANGLE).round() * SNAP_ANGLE
}

/// Signed angle swept around `pivot` going from `from` to `to`.
pub(crate) fn swept_angle(pivot: Point, from: Point, to: Point) -> f64 {
    let start = (from.y - pivot.y).atan2(from.x - pivot.x);
    let end = (to.y - pivot.y).atan2(to.x - pivot.x);
    normalize_angle(end - start)
}

impl TransformKind for RotateTransform {
    fn tool_kind(&self) -> ToolKind {
        ToolKind::Rotate
    }

    fn features(&self) -> GridFeatures {
        GridFeatures {
            use_grid: true,
            use_handles: false,
            use_mid_handles: false,
            use_pivot: true,
            use_center: false,
        }
    }

    fn prepare(&self, bounds: &ContentBounds) -> TransformParameters {
        let center = bounds.center();
        let mut params = TransformParameters::default();
        params[ANGLE] = 0.0;
        params[PIVOT_X] = center.x;
        params[PIVOT_Y] = center.y;
        params
    }

    fn on_motion(&self, params: &mut TransformParameters, motion: &MotionContext<'_>) {
        let start = motion.start;
        match motion.function {
            TransformFunction::Rotation => {
                let pivot = Point::new(start[PIVOT_X], start[PIVOT_Y]);
                let mut angle = start[ANGLE] + swept_angle(pivot, motion.origin, motion.current);
                if motion.options.constrain.rotate {
                    angle = snap_angle(angle);
                }
                params[ANGLE] = normalize_angle(angle);
            }
            TransformFunction::Pivot if !motion.options.fixed_pivot => {
                let (dx, dy) = motion.delta();
                params[PIVOT_X] = start[PIVOT_X] + dx;
                params[PIVOT_Y] = start[PIVOT_Y] + dy;
            }
            _ => {}
        }
    }

    fn recalc_matrix(
        &self,
        params: &TransformParameters,
        _bounds: &ContentBounds,
    ) -> Result<TransformMatrix, Singular> {
        Ok(TransformMatrix::rotation_about(
            Point::new(params[PIVOT_X], params[PIVOT_Y]),
            params[ANGLE],
        ))
    }

    fn pivot(&self, params: &TransformParameters, _bounds: &ContentBounds) -> Point {
        Point::new(params[PIVOT_X], params[PIVOT_Y])
    }

    fn free_drag(&self) -> Option<TransformFunction> {
        Some(TransformFunction::Rotation)
    }

    fn undo_description(&self, params: &TransformParameters) -> String {
        format!(
            "Rotate by {:.2}° around ({}, {})",
            params[ANGLE].to_degrees(),
            params[PIVOT_X],
            params[PIVOT_Y]
        )
    }

    fn progress_label(&self) -> &'static str {
        "Rotating"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::TransformOptions;

    fn rotate_drag(function: TransformFunction, to: Point, options: &TransformOptions) -> TransformParameters {
        let bounds = ContentBounds::new(0, 0, 100, 100);
        let start = RotateTransform.prepare(&bounds);
        let mut params = start;
        RotateTransform.on_motion(
            &mut params,
            &MotionContext {
                function,
                start: &start,
                origin: Point::new(100.0, 50.0),
                current: to,
                bounds: &bounds,
                options,
                snap_radius: 0.0,
            },
        );
        params
    }

    #[test]
    fn free_drag_rotates_about_pivot() {
        let params = rotate_drag(TransformFunction::Rotation, Point::new(50.0, 100.0), &TransformOptions::default());
        assert!((params[ANGLE] - PI / 2.0).abs() < 1e-12);

        let matrix = RotateTransform
            .recalc_matrix(&params, &ContentBounds::new(0, 0, 100, 100))
            .expect("rotation matrix");
        let mapped = matrix.apply(Point::new(100.0, 50.0));
        assert!((mapped.x - 50.0).abs() < 1e-9);
        assert!((mapped.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn constrain_snaps_to_fifteen_degrees() {
        let mut options = TransformOptions::default();
        options.constrain.rotate = true;
        // About 21.8 degrees.
        let params = rotate_drag(TransformFunction::Rotation, Point::new(100.0, 70.0), &options);
        assert!((params[ANGLE] - SNAP_ANGLE).abs() < 1e-12);
    }

    #[test]
    fn pivot_handle_moves_pivot_unless_fixed() {
        let mut options = TransformOptions::default();
        let moved = rotate_drag(TransformFunction::Pivot, Point::new(110.0, 40.0), &options);
        assert_eq!(RotateTransform.pivot(&moved, &ContentBounds::default()), Point::new(60.0, 40.0));
        assert_eq!(moved[ANGLE], 0.0);

        options.fixed_pivot = true;
        let fixed = rotate_drag(TransformFunction::Pivot, Point::new(110.0, 40.0), &options);
        assert_eq!(RotateTransform.pivot(&fixed, &ContentBounds::default()), Point::new(50.0, 50.0));
    }

    #[test]
    fn angles_wrap_into_half_open_range() {
        assert!((normalize_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((normalize_angle(-PI) - PI).abs() < 1e-12);
        assert_eq!(normalize_angle(0.5), 0.5);
    }
}
