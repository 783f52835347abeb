use super::perspective::{drag_corner, quad_center};
use super::rotate::{snap_angle, swept_angle};
use super::{
    dominant_axis, quad_corners, store_quad_corners, MotionContext, ToolKind, TransformKind,
    TransformParameters,
};
use crate::geometry::{ContentBounds, Point, Singular, TransformMatrix};
use crate::handles::{BoundingQuad, GridFeatures, HandleSet, TransformFunction, ViewTransform};

const PIVOT_X: usize = 8;
const PIVOT_Y: usize = 9;

/// Move, rotate, scale and perspective on one set of handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnifiedTransform;

impl UnifiedTransform {
    pub fn parameters(corners: &[Point; 4], pivot: Point) -> TransformParameters {
        let mut params = TransformParameters::default();
        store_quad_corners(&mut params, corners);
        params[PIVOT_X] = pivot.x;
        params[PIVOT_Y] = pivot.y;
        params
    }
}

fn opposite_edge(edge: TransformFunction) -> Option<TransformFunction> {
    match edge {
        TransformFunction::N => Some(TransformFunction::S),
        TransformFunction::S => Some(TransformFunction::N),
        TransformFunction::E => Some(TransformFunction::W),
        TransformFunction::W => Some(TransformFunction::E),
        _ => None,
    }
}

/// Splits a drag on the edge `a`-`b` into the part along the edge (shear)
/// and the part across it (scale).
fn split_edge_delta(a: Point, b: Point, (dx, dy): (f64, f64)) -> ((f64, f64), (f64, f64)) {
    let (ex, ey) = (b.x - a.x, b.y - a.y);
    let length_squared = ex * ex + ey * ey;
    if length_squared <= f64::EPSILON {
        return ((0.0, 0.0), (dx, dy));
    }
    let along = (dx * ex + dy * ey) / length_squared;
    let across = (dy * ex - dx * ey) / length_squared;
    ((ex * along, ey * along), (-ey * across, ex * across))
}

fn magnitude_squared((x, y): (f64, f64)) -> f64 {
    x * x + y * y
}

/// Nearest corner or quad center within `radius` of `point`, else `point`.
fn snap_to_anchor(point: Point, corners: &[Point; 4], radius: f64) -> Point {
    let limit = radius * radius;
    corners
        .iter()
        .copied()
        .chain(std::iter::once(quad_center(corners)))
        .map(|anchor| (anchor.distance_squared(point), anchor))
        .filter(|(distance, _)| *distance <= limit)
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map_or(point, |(_, anchor)| anchor)
}

impl TransformKind for UnifiedTransform {
    fn tool_kind(&self) -> ToolKind {
        ToolKind::Unified
    }

    fn features(&self) -> GridFeatures {
        GridFeatures {
            use_grid: true,
            use_handles: true,
            use_mid_handles: true,
            use_pivot: true,
            use_center: true,
        }
    }

    fn prepare(&self, bounds: &ContentBounds) -> TransformParameters {
        let mut params = TransformParameters::default();
        store_quad_corners(&mut params, &bounds.corners());
        let center = bounds.center();
        params[PIVOT_X] = center.x;
        params[PIVOT_Y] = center.y;
        params
    }

    fn on_motion(&self, params: &mut TransformParameters, motion: &MotionContext<'_>) {
        let start = motion.start;
        let options = motion.options;
        let mut corners = quad_corners(start);
        let mut pivot = Point::new(start[PIVOT_X], start[PIVOT_Y]);
        let delta = motion.delta();

        match motion.function {
            TransformFunction::Move | TransformFunction::Center => {
                let (dx, dy) = if options.constrain.move_ {
                    dominant_axis(delta.0, delta.1)
                } else {
                    delta
                };
                for corner in &mut corners {
                    *corner = corner.offset(dx, dy);
                }
                if !options.fixed_pivot {
                    pivot = pivot.offset(dx, dy);
                }
            }
            TransformFunction::Rotation => {
                let mut angle = swept_angle(pivot, motion.origin, motion.current);
                if options.constrain.rotate {
                    angle = snap_angle(angle);
                }
                let rotation = TransformMatrix::rotation_about(pivot, angle);
                for corner in &mut corners {
                    *corner = rotation.apply(*corner);
                }
            }
            TransformFunction::Pivot => {
                if options.fixed_pivot {
                    return;
                }
                pivot = pivot.offset(delta.0, delta.1);
                if options.corner_snap {
                    pivot = snap_to_anchor(pivot, &corners, motion.snap_radius);
                }
            }
            function if function.is_corner() => {
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
            function => {
                let Some((a, b)) = function.edge_corners() else {
                    return;
                };
                let (along, across) = split_edge_delta(corners[a], corners[b], delta);
                let none = (0.0, 0.0);
                let (shear, scale) = match (options.constrain.scale, options.constrain.shear) {
                    (true, false) => (none, across),
                    (false, true) => (along, none),
                    (true, true) if magnitude_squared(along) > magnitude_squared(across) => (along, none),
                    (true, true) => (none, across),
                    (false, false) => (along, across),
                };
                let (dx, dy) = (shear.0 + scale.0, shear.1 + scale.1);
                corners[a] = corners[a].offset(dx, dy);
                corners[b] = corners[b].offset(dx, dy);

                let mut mirrored = none;
                if options.from_pivot.scale {
                    mirrored = (mirrored.0 - scale.0, mirrored.1 - scale.1);
                }
                if options.from_pivot.shear {
                    mirrored = (mirrored.0 - shear.0, mirrored.1 - shear.1);
                }
                if let Some((c, d)) = opposite_edge(function).and_then(TransformFunction::edge_corners) {
                    corners[c] = corners[c].offset(mirrored.0, mirrored.1);
                    corners[d] = corners[d].offset(mirrored.0, mirrored.1);
                }
            }
        }

        store_quad_corners(params, &corners);
        params[PIVOT_X] = pivot.x;
        params[PIVOT_Y] = pivot.y;
    }

    fn recalc_matrix(
        &self,
        params: &TransformParameters,
        bounds: &ContentBounds,
    ) -> Result<TransformMatrix, Singular> {
        TransformMatrix::rect_to_quad(bounds, &quad_corners(params))
    }

    fn pivot(&self, params: &TransformParameters, _bounds: &ContentBounds) -> Point {
        Point::new(params[PIVOT_X], params[PIVOT_Y])
    }

    /// Every handle needs an exact hit here; otherwise the pointer moves the
    /// content from inside the quad and rotates it from outside.
    fn pick_function(
        &self,
        pointer: Point,
        quad: &BoundingQuad,
        handles: &HandleSet,
        view: &ViewTransform,
    ) -> TransformFunction {
        let hit = |function| {
            handles
                .get(function)
                .is_some_and(|handle| handle.hit(pointer, view))
        };

        let handle = [TransformFunction::Center, TransformFunction::Pivot]
            .into_iter()
            .chain(TransformFunction::CORNERS)
            .chain(TransformFunction::EDGES)
            .find(|function| hit(*function));

        match handle {
            Some(function) => function,
            None if quad.contains(pointer) => TransformFunction::Move,
            None => TransformFunction::Rotation,
        }
    }

    fn free_drag(&self) -> Option<TransformFunction> {
        Some(TransformFunction::Move)
    }

    fn undo_description(&self, _params: &TransformParameters) -> String {
        "Unified Transform".to_string()
    }

    fn progress_label(&self) -> &'static str {
        "Transforming"
    }
}
