use super::{dominant_axis, MotionContext, ToolKind, TransformKind, TransformParameters};
use crate::geometry::{ContentBounds, Point, Singular, TransformMatrix};
use crate::handles::{GridFeatures, TransformFunction};

const X0: usize = 0;
const Y0: usize = 1;
const X1: usize = 2;
const Y1: usize = 3;

/// Smallest width or height, in pixels, a scaled result may have.
const MIN_EXTENT: f64 = 1.0;

/// Axis-aligned resize of the content rectangle.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleTransform;

impl ScaleTransform {
    /// Parameters mapping the content onto the rectangle `(x0, y0)-(x1, y1)`.
    pub fn parameters(x0: f64, y0: f64, x1: f64, y1: f64) -> TransformParameters {
        let mut params = TransformParameters::default();
        params[X0] = x0;
        params[Y0] = y0;
        params[X1] = x1;
        params[Y1] = y1;
        params
    }
}

fn signum_or_one(value: f64) -> f64 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

impl TransformKind for ScaleTransform {
    fn tool_kind(&self) -> ToolKind {
        ToolKind::Scale
    }

    fn features(&self) -> GridFeatures {
        GridFeatures {
            use_grid: true,
            use_handles: true,
            use_mid_handles: true,
            use_pivot: false,
            use_center: true,
        }
    }

    fn prepare(&self, bounds: &ContentBounds) -> TransformParameters {
        let mut params = TransformParameters::default();
        params[X0] = f64::from(bounds.x1);
        params[Y0] = f64::from(bounds.y1);
        params[X1] = f64::from(bounds.x2);
        params[Y1] = f64::from(bounds.y2);
        params
    }

    fn on_motion(&self, params: &mut TransformParameters, motion: &MotionContext<'_>) {
        use TransformFunction::*;

        let (dx, dy) = motion.delta();
        let options = motion.options;
        let start = motion.start;
        let (mut x0, mut y0, mut x1, mut y1) = (start[X0], start[Y0], start[X1], start[Y1]);

        match motion.function {
            Center | Move => {
                let (dx, dy) = if options.constrain.move_ {
                    dominant_axis(dx, dy)
                } else {
                    (dx, dy)
                };
                params[X0] = x0 + dx;
                params[Y0] = y0 + dy;
                params[X1] = x1 + dx;
                params[Y1] = y1 + dy;
                return;
            }
            Nw | Ne | Sw | Se | N | E | S | W => {}
            _ => return,
        }

        let function = motion.function;
        let moves_left = matches!(function, Nw | Sw | W);
        let moves_right = matches!(function, Ne | Se | E);
        let moves_top = matches!(function, Nw | Ne | N);
        let moves_bottom = matches!(function, Sw | Se | S);
        let from_pivot = options.from_pivot.scale;

        if moves_left {
            x0 += dx;
            if from_pivot {
                x1 -= dx;
            }
        }
        if moves_right {
            x1 += dx;
            if from_pivot {
                x0 -= dx;
            }
        }
        if moves_top {
            y0 += dy;
            if from_pivot {
                y1 -= dy;
            }
        }
        if moves_bottom {
            y1 += dy;
            if from_pivot {
                y0 -= dy;
            }
        }

        if options.constrain.scale {
            let aspect = motion.bounds.aspect();
            let width = x1 - x0;
            let height = y1 - y0;
            let fit_height = width.abs() / aspect >= height.abs();

            let new_width = (function.is_corner() && !fit_height) || matches!(function, N | S);
            let new_height = (function.is_corner() && fit_height) || matches!(function, E | W);

            if new_width {
                let target = height.abs() * aspect * signum_or_one(width);
                if from_pivot || !function.is_corner() {
                    let center = (x0 + x1) / 2.0;
                    x0 = center - target / 2.0;
                    x1 = center + target / 2.0;
                } else if moves_left {
                    x0 = x1 - target;
                } else {
                    x1 = x0 + target;
                }
            }
            if new_height {
                let target = width.abs() / aspect * signum_or_one(height);
                if from_pivot || !function.is_corner() {
                    let center = (y0 + y1) / 2.0;
                    y0 = center - target / 2.0;
                    y1 = center + target / 2.0;
                } else if moves_top {
                    y0 = y1 - target;
                } else {
                    y1 = y0 + target;
                }
            }
        }

        params[X0] = x0;
        params[Y0] = y0;
        params[X1] = x1;
        params[Y1] = y1;
    }

    fn recalc_matrix(
        &self,
        params: &TransformParameters,
        bounds: &ContentBounds,
    ) -> Result<TransformMatrix, Singular> {
        let width = params[X1] - params[X0];
        let height = params[Y1] - params[Y0];
        if bounds.is_empty() || width.abs() < MIN_EXTENT || height.abs() < MIN_EXTENT {
            return Err(Singular {
                determinant: width * height,
            });
        }

        let mut matrix = TransformMatrix::identity();
        matrix.translate(-f64::from(bounds.x1), -f64::from(bounds.y1));
        matrix.scale(width / f64::from(bounds.width()), height / f64::from(bounds.height()));
        matrix.translate(params[X0], params[Y0]);
        Ok(matrix)
    }

    fn pivot(&self, params: &TransformParameters, _bounds: &ContentBounds) -> Point {
        Point::new((params[X0] + params[X1]) / 2.0, (params[Y0] + params[Y1]) / 2.0)
    }

    fn undo_description(&self, params: &TransformParameters) -> String {
        let width = (params[X1] - params[X0]).abs().round();
        let height = (params[Y1] - params[Y0]).abs().round();
        format!("Scale to {width} x {height}")
    }

    fn progress_label(&self) -> &'static str {
        "Scaling"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::TransformOptions;

    fn drag(
        function: TransformFunction,
        bounds: &ContentBounds,
        from: Point,
        to: Point,
        options: &TransformOptions,
    ) -> TransformParameters {
        let scale = ScaleTransform;
        let start = scale.prepare(bounds);
        let mut params = start;
        scale.on_motion(
            &mut params,
            &MotionContext {
                function,
                start: &start,
                origin: from,
                current: to,
                bounds,
                options,
                snap_radius: 0.0,
            },
        );
        params
    }

    #[test]
    fn corner_drag_moves_only_its_sides() {
        let bounds = ContentBounds::new(0, 0, 100, 100);
        let params = drag(
            TransformFunction::Se,
            &bounds,
            Point::new(100.0, 100.0),
            Point::new(150.0, 120.0),
            &TransformOptions::default(),
        );
        assert_eq!(&params.slots()[..4], &[0.0, 0.0, 150.0, 120.0]);

        let matrix = ScaleTransform.recalc_matrix(&params, &bounds).expect("scale matrix");
        assert_eq!(matrix.apply(Point::new(100.0, 100.0)), Point::new(150.0, 120.0));
    }

    #[test]
    fn from_pivot_mirrors_opposite_sides() {
        let bounds = ContentBounds::new(0, 0, 100, 100);
        let mut options = TransformOptions::default();
        options.from_pivot.scale = true;
        let params = drag(
            TransformFunction::Se,
            &bounds,
            Point::new(100.0, 100.0),
            Point::new(150.0, 150.0),
            &options,
        );
        assert_eq!(&params.slots()[..4], &[-50.0, -50.0, 150.0, 150.0]);
    }

    #[test]
    fn constrain_keeps_aspect_ratio_anchored_at_opposite_corner() {
        let bounds = ContentBounds::new(0, 0, 200, 100);
        let mut options = TransformOptions::default();
        options.constrain.scale = true;
        let params = drag(
            TransformFunction::Se,
            &bounds,
            Point::new(200.0, 100.0),
            Point::new(400.0, 110.0),
            &options,
        );
        assert_eq!(&params.slots()[..4], &[0.0, 0.0, 400.0, 200.0]);

        let edge = drag(
            TransformFunction::E,
            &bounds,
            Point::new(200.0, 50.0),
            Point::new(100.0, 50.0),
            &options,
        );
        assert_eq!(&edge.slots()[..4], &[0.0, 25.0, 100.0, 75.0]);
    }

    #[test]
    fn center_drag_translates_and_can_lock_axis() {
        let bounds = ContentBounds::new(0, 0, 10, 10);
        let mut options = TransformOptions::default();
        let free = drag(TransformFunction::Center, &bounds, Point::new(5.0, 5.0), Point::new(8.0, 6.0), &options);
        assert_eq!(&free.slots()[..4], &[3.0, 1.0, 13.0, 11.0]);

        options.constrain.move_ = true;
        let locked = drag(TransformFunction::Center, &bounds, Point::new(5.0, 5.0), Point::new(8.0, 6.0), &options);
        assert_eq!(&locked.slots()[..4], &[3.0, 0.0, 13.0, 10.0]);
    }

    #[test]
    fn collapsed_width_is_singular() {
        let bounds = ContentBounds::new(0, 0, 100, 100);
        let params = drag(
            TransformFunction::E,
            &bounds,
            Point::new(100.0, 50.0),
            Point::new(0.5, 50.0),
            &TransformOptions::default(),
        );
        assert!(ScaleTransform.recalc_matrix(&params, &bounds).is_err());
    }

    #[test]
    fn unrelated_function_leaves_parameters_untouched() {
        let bounds = ContentBounds::new(0, 0, 10, 10);
        let params = drag(
            TransformFunction::Rotation,
            &bounds,
            Point::new(0.0, 0.0),
            Point::new(8.0, 6.0),
            &TransformOptions::default(),
        );
        assert_eq!(params, ScaleTransform.prepare(&bounds));
        assert_eq!(ScaleTransform.undo_description(&params), "Scale to 10 x 10");
    }
}
