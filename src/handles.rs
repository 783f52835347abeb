//! Bounding quad and interactive handle geometry for a transform session.

use crate::geometry::{ContentBounds, Point, TransformMatrix};

pub const MIN_HANDLE_SIZE: i32 = 6;
pub const MAX_HANDLE_SIZE: i32 = 40;

/// What a pointer interaction currently operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformFunction {
    /// Tool armed, no handle resolved yet.
    Creating,
    HandleNone,
    Nw,
    Ne,
    Sw,
    Se,
    N,
    E,
    S,
    W,
    Pivot,
    Center,
    Move,
    Rotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorHint {
    Crosshair,
    CornerTopLeft,
    CornerTopRight,
    CornerBottomLeft,
    CornerBottomRight,
    SideTop,
    SideRight,
    SideBottom,
    SideLeft,
    Move,
    Rotate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorModifier {
    None,
    Move,
    Bad,
}

impl TransformFunction {
    pub const CORNERS: [TransformFunction; 4] = [Self::Nw, Self::Ne, Self::Sw, Self::Se];
    pub const EDGES: [TransformFunction; 4] = [Self::N, Self::E, Self::S, Self::W];

    /// Index into the NW, NE, SW, SE corner order.
    pub const fn corner_index(self) -> Option<usize> {
        match self {
            Self::Nw => Some(0),
            Self::Ne => Some(1),
            Self::Sw => Some(2),
            Self::Se => Some(3),
            _ => None,
        }
    }

    /// The two corner indices spanning an edge handle.
    pub const fn edge_corners(self) -> Option<(usize, usize)> {
        match self {
            Self::N => Some((0, 1)),
            Self::E => Some((1, 3)),
            Self::S => Some((2, 3)),
            Self::W => Some((0, 2)),
            _ => None,
        }
    }

    pub const fn is_corner(self) -> bool {
        self.corner_index().is_some()
    }

    pub const fn is_edge(self) -> bool {
        self.edge_corners().is_some()
    }

    pub const fn cursor(self, use_handles: bool) -> CursorHint {
        if !use_handles {
            return match self {
                Self::Move | Self::Center => CursorHint::Move,
                Self::Rotation => CursorHint::Rotate,
                _ => CursorHint::Crosshair,
            };
        }
        match self {
            Self::Nw => CursorHint::CornerTopLeft,
            Self::Ne => CursorHint::CornerTopRight,
            Self::Sw => CursorHint::CornerBottomLeft,
            Self::Se => CursorHint::CornerBottomRight,
            Self::N => CursorHint::SideTop,
            Self::E => CursorHint::SideRight,
            Self::S => CursorHint::SideBottom,
            Self::W => CursorHint::SideLeft,
            Self::Move => CursorHint::Move,
            Self::Rotation => CursorHint::Rotate,
            _ => CursorHint::Crosshair,
        }
    }
}

/// Which parts of the grid and handle set a transform kind exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridFeatures {
    pub use_grid: bool,
    pub use_handles: bool,
    pub use_mid_handles: bool,
    pub use_pivot: bool,
    pub use_center: bool,
}

/// Image-to-screen mapping of the display the session is bound to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewTransform {
    pub const fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    pub const fn new(scale: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            scale_x: scale,
            scale_y: scale,
            offset_x,
            offset_y,
        }
    }

    pub fn to_screen(&self, point: Point) -> Point {
        Point::new(
            point.x * self.scale_x - self.offset_x,
            point.y * self.scale_y - self.offset_y,
        )
    }

    pub fn to_screen_i32(&self, point: Point) -> (i32, i32) {
        let screen = self.to_screen(point);
        (screen.x.round() as i32, screen.y.round() as i32)
    }

    pub fn to_image(&self, screen: Point) -> Point {
        Point::new(
            (screen.x + self.offset_x) / self.scale_x,
            (screen.y + self.offset_y) / self.scale_y,
        )
    }
}

/// Transformed corners of the content bounds plus the pivot and center
/// points, all in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingQuad {
    /// NW, NE, SW, SE.
    pub corners: [Point; 4],
    pub pivot: Point,
    pub center: Point,
}

impl BoundingQuad {
    /// The pivot is taken as given; only the corners pass through `matrix`.
    pub fn compute(matrix: &TransformMatrix, bounds: &ContentBounds, pivot: Point) -> Self {
        let corners = bounds.corners().map(|corner| matrix.apply(corner));
        let center = Point::new(
            corners.iter().map(|corner| corner.x).sum::<f64>() / 4.0,
            corners.iter().map(|corner| corner.y).sum::<f64>() / 4.0,
        );
        Self {
            corners,
            pivot,
            center,
        }
    }

    pub fn edge_midpoint(&self, edge: TransformFunction) -> Option<Point> {
        let (a, b) = edge.edge_corners()?;
        Some(self.corners[a].midpoint(self.corners[b]))
    }

    /// Whether `point` lies inside the quad outline (even-odd rule).
    pub fn contains(&self, point: Point) -> bool {
        let [nw, ne, sw, se] = self.corners;
        let outline = [nw, ne, se, sw];
        let mut inside = false;
        let mut previous = outline[outline.len() - 1];
        for current in outline {
            if (current.y > point.y) != (previous.y > point.y) {
                let crossing_x = (previous.x - current.x) * (point.y - current.y)
                    / (previous.y - current.y)
                    + current.x;
                if point.x < crossing_x {
                    inside = !inside;
                }
            }
            previous = current;
        }
        inside
    }

    /// Axis-aligned screen extents of the corners as `(x1, y1, x2, y2)`.
    pub fn screen_extents(&self, view: &ViewTransform) -> (i32, i32, i32, i32) {
        let screen = self.corners.map(|corner| view.to_screen_i32(corner));
        let x1 = screen.iter().map(|p| p.0).min().unwrap_or(0);
        let y1 = screen.iter().map(|p| p.1).min().unwrap_or(0);
        let x2 = screen.iter().map(|p| p.0).max().unwrap_or(0);
        let y2 = screen.iter().map(|p| p.1).max().unwrap_or(0);
        (x1, y1, x2, y2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleSize {
    pub width: i32,
    pub height: i32,
}

pub fn handle_dimension(screen_extent: i32) -> i32 {
    (screen_extent / 3).clamp(MIN_HANDLE_SIZE, MAX_HANDLE_SIZE)
}

pub fn handle_size(quad: &BoundingQuad, view: &ViewTransform) -> HandleSize {
    let (x1, y1, x2, y2) = quad.screen_extents(view);
    HandleSize {
        width: handle_dimension(x2.saturating_sub(x1)),
        height: handle_dimension(y2.saturating_sub(y1)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleShape {
    Square,
    Circle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub function: TransformFunction,
    /// Anchor (center) of the handle in image coordinates.
    pub position: Point,
    pub shape: HandleShape,
    /// Screen-space size in pixels.
    pub width: i32,
    pub height: i32,
}

impl Handle {
    pub fn hit(&self, pointer: Point, view: &ViewTransform) -> bool {
        let anchor = view.to_screen(self.position);
        let pointer = view.to_screen(pointer);
        let dx = pointer.x - anchor.x;
        let dy = pointer.y - anchor.y;
        match self.shape {
            HandleShape::Square => {
                dx.abs() <= f64::from(self.width) / 2.0 && dy.abs() <= f64::from(self.height) / 2.0
            }
            HandleShape::Circle => {
                let radius = f64::from(self.width.min(self.height)) / 2.0;
                dx * dx + dy * dy <= radius * radius
            }
        }
    }
}

/// Hit-test geometry for every handle drawn this frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandleSet {
    handles: Vec<Handle>,
}

impl HandleSet {
    pub fn build(quad: &BoundingQuad, size: HandleSize, features: GridFeatures) -> Self {
        let mut handles = Vec::new();
        let square = |function, position| Handle {
            function,
            position,
            shape: HandleShape::Square,
            width: size.width,
            height: size.height,
        };

        if features.use_handles {
            for (function, corner) in TransformFunction::CORNERS.into_iter().zip(quad.corners) {
                handles.push(square(function, corner));
            }
            if features.use_mid_handles {
                for edge in TransformFunction::EDGES {
                    if let Some(midpoint) = quad.edge_midpoint(edge) {
                        handles.push(square(edge, midpoint));
                    }
                }
            }
        }

        let diameter = size.width.min(size.height);
        if features.use_pivot {
            // Doubled so it can still be grabbed from under the center handle.
            let pivot_diameter = if features.use_center {
                diameter * 2
            } else {
                diameter
            };
            handles.push(Handle {
                function: TransformFunction::Pivot,
                position: quad.pivot,
                shape: HandleShape::Circle,
                width: pivot_diameter,
                height: pivot_diameter,
            });
        }

        if features.use_center {
            handles.push(Handle {
                function: TransformFunction::Center,
                position: quad.center,
                shape: HandleShape::Square,
                width: diameter,
                height: diameter,
            });
        }

        Self { handles }
    }

    pub fn get(&self, function: TransformFunction) -> Option<&Handle> {
        self.handles.iter().find(|handle| handle.function == function)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handle> {
        self.handles.iter()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn hit(&self, function: TransformFunction, pointer: Point, view: &ViewTransform) -> bool {
        self.get(function)
            .is_some_and(|handle| handle.hit(pointer, view))
    }
}

/// Resolves the handle under `pointer`.
///
/// Corners are picked by nearest screen distance with no tolerance, while
/// edge, pivot and center handles need the pointer inside their outline.
/// Edge hits override the nearest corner, and pivot then center override
/// both.
pub fn pick_function(
    pointer: Point,
    quad: &BoundingQuad,
    handles: &HandleSet,
    view: &ViewTransform,
    features: GridFeatures,
) -> TransformFunction {
    let mut function = TransformFunction::HandleNone;

    if features.use_handles {
        let screen_pointer = view.to_screen(pointer);
        let mut closest = f64::INFINITY;
        for (candidate, corner) in TransformFunction::CORNERS.into_iter().zip(quad.corners) {
            let distance = view.to_screen(corner).distance_squared(screen_pointer);
            if distance < closest {
                closest = distance;
                function = candidate;
            }
        }

        if features.use_mid_handles {
            if let Some(edge) = TransformFunction::EDGES
                .into_iter()
                .find(|edge| handles.hit(*edge, pointer, view))
            {
                function = edge;
            }
        }
    }

    if features.use_pivot && handles.hit(TransformFunction::Pivot, pointer, view) {
        function = TransformFunction::Pivot;
    }

    if features.use_center && handles.hit(TransformFunction::Center, pointer, view) {
        function = TransformFunction::Center;
    }

    function
}
