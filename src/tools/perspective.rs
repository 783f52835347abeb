use super::{
    dominant_axis, quad_corners, store_quad_corners, MotionContext, ToolKind, TransformKind,
    TransformParameters,
};
use crate::geometry::{ContentBounds, Point, Singular, TransformMatrix};
use crate::handles::{GridFeatures, TransformFunction};

/// Free placement of the four corners of the content.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerspectiveTransform;

impl PerspectiveTransform {
    /// Corners in NW, NE, SW, SE order.
    pub fn parameters(corners: &[Point; 4]) -> TransformParameters {
        let mut params = TransformParameters::default();
        store_quad_corners(&mut params, corners);
        params
    }
}

pub(crate) fn quad_center(corners: &[Point; 4]) -> Point {
    Point::new(
        corners.iter().map(|corner| corner.x).sum::<f64>() / 4.0,
        corners.iter().map(|corner| corner.y).sum::<f64>() / 4.0,
    )
}

/// Moves corner `index` by the drag delta, and the diagonally opposite
/// corner inversely when `from_pivot` is set.
pub(crate) fn drag_corner(
    corners: &mut [Point; 4],
    index: usize,
    (dx, dy): (f64, f64),
    constrain: bool,
    from_pivot: bool,
) {
    let (dx, dy) = if constrain { dominant_axis(dx, dy) } else { (dx, dy) };
    corners[index] = corners[index].offset(dx, dy);
    if from_pivot {
        let opposite = 3 - index;
        corners[opposite] = corners[opposite].offset(-dx, -dy);
    }
}

impl TransformKind for PerspectiveTransform {
    fn tool_kind(&self) -> ToolKind {
        ToolKind::Perspective
    }

    fn features(&self) -> GridFeatures {
        GridFeatures {
            use_grid: true,
            use_handles: true,
            use_mid_handles: false,
            use_pivot: false,
            use_center: true,
        }
    }

    fn prepare(&self, bounds: &ContentBounds) -> TransformParameters {
        let mut params = TransformParameters::default();
        store_quad_corners(&mut params, &bounds.corners());
        params
    }

    fn on_motion(&self, params: &mut TransformParameters, motion: &MotionContext<'_>) {
        let mut corners = quad_corners(motion.start);
        let delta = motion.delta();
        let options = motion.options;

        match motion.function {
            TransformFunction::Center | TransformFunction::Move => {
                let (dx, dy) = if options.constrain.move_ {
                    dominant_axis(delta.0, delta.1)
                } else {
                    delta
                };
                for corner in &mut corners {
                    *corner = corner.offset(dx, dy);
                }
            }
            function => {
                let Some(index) = function.corner_index() else {
                    return;
                };
                drag_corner(
                    &mut corners,
                    index,
                    delta,
                    options.constrain.perspective,
                    options.from_pivot.perspective,
                );
            }
        }

        store_quad_corners(params, &corners);
    }

    fn recalc_matrix(
        &self,
        params: &TransformParameters,
        bounds: &ContentBounds,
    ) -> Result<TransformMatrix, Singular> {
        TransformMatrix::rect_to_quad(bounds, &quad_corners(params))
    }

    fn pivot(&self, params: &TransformParameters, _bounds: &ContentBounds) -> Point {
        quad_center(&quad_corners(params))
    }

    fn undo_description(&self, _params: &TransformParameters) -> String {
        "Perspective".to_string()
    }

    fn progress_label(&self) -> &'static str {
        "Perspective transformation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::TransformOptions;

    fn corner_drag(function: TransformFunction, delta: (f64, f64), options: &TransformOptions) -> [Point; 4] {
        let bounds = ContentBounds::new(0, 0, 100, 100);
        let start = PerspectiveTransform.prepare(&bounds);
        let mut params = start;
        PerspectiveTransform.on_motion(
            &mut params,
            &MotionContext {
                function,
                start: &start,
                origin: Point::new(0.0, 0.0),
                current: Point::new(delta.0, delta.1),
                bounds: &bounds,
                options,
                snap_radius: 0.0,
            },
        );
        quad_corners(&params)
    }

    #[test]
    fn corner_drag_moves_single_point_and_maps_it() {
        let corners = corner_drag(TransformFunction::Ne, (10.0, -5.0), &TransformOptions::default());
        assert_eq!(corners[1], Point::new(110.0, -5.0));
        assert_eq!(corners[0], Point::new(0.0, 0.0));

        let bounds = ContentBounds::new(0, 0, 100, 100);
        let mut params = TransformParameters::default();
        store_quad_corners(&mut params, &corners);
        let matrix = PerspectiveTransform.recalc_matrix(&params, &bounds).expect("perspective matrix");
        let mapped = matrix.apply(Point::new(100.0, 0.0));
        assert!((mapped.x - 110.0).abs() < 1e-9);
        assert!((mapped.y + 5.0).abs() < 1e-9);
    }

    #[test]
    fn constrain_and_from_pivot_modify_corner_drag() {
        let mut options = TransformOptions::default();
        options.constrain.perspective = true;
        options.from_pivot.perspective = true;
        let corners = corner_drag(TransformFunction::Nw, (3.0, 8.0), &options);
        assert_eq!(corners[0], Point::new(0.0, 8.0));
        assert_eq!(corners[3], Point::new(100.0, 92.0));
        assert_eq!(corners[1], Point::new(100.0, 0.0));
    }

    #[test]
    fn center_drag_translates_all_corners() {
        let corners = corner_drag(TransformFunction::Center, (4.0, 2.0), &TransformOptions::default());
        assert_eq!(corners[2], Point::new(4.0, 102.0));
        assert_eq!(quad_center(&corners), Point::new(54.0, 52.0));
    }

    #[test]
    fn collapsed_quad_is_singular() {
        let bounds = ContentBounds::new(0, 0, 100, 100);
        let mut params = TransformParameters::default();
        store_quad_corners(&mut params, &[Point::new(5.0, 5.0); 4]);
        assert!(PerspectiveTransform.recalc_matrix(&params, &bounds).is_err());
    }
}
