//! Shared geometric primitives: points, content bounds and the 3x3 homogeneous
//! transform matrix used by every stage of a transform session.

use thiserror::Error;

/// Determinant magnitude below which a matrix is treated as non-invertible.
pub const SINGULAR_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn offset(self, dx: f64, dy: f64) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Untransformed extents of the content under transformation, in image
/// coordinates. `x2`/`y2` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentBounds {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl ContentBounds {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub const fn from_origin_size(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x.saturating_add(width as i32),
            y2: y.saturating_add(height as i32),
        }
    }

    pub const fn width(&self) -> i32 {
        self.x2.saturating_sub(self.x1)
    }

    pub const fn height(&self) -> i32 {
        self.y2.saturating_sub(self.y1)
    }

    pub const fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn center(&self) -> Point {
        Point::new(
            (f64::from(self.x1) + f64::from(self.x2)) / 2.0,
            (f64::from(self.y1) + f64::from(self.y2)) / 2.0,
        )
    }

    pub fn aspect(&self) -> f64 {
        f64::from(self.width()) / f64::from(self.height().max(1))
    }

    /// Corners in NW, NE, SW, SE order.
    pub fn corners(&self) -> [Point; 4] {
        let (x1, y1) = (f64::from(self.x1), f64::from(self.y1));
        let (x2, y2) = (f64::from(self.x2), f64::from(self.y2));
        [
            Point::new(x1, y1),
            Point::new(x2, y1),
            Point::new(x1, y2),
            Point::new(x2, y2),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("transform matrix is singular (determinant {determinant})")]
pub struct Singular {
    pub determinant: f64,
}

/// Row-major 3x3 matrix acting on column vectors `(x, y, 1)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    pub coeff: [[f64; 3]; 3],
}

impl Default for TransformMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl TransformMatrix {
    pub const fn identity() -> Self {
        Self {
            coeff: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }

    pub const fn from_rows(coeff: [[f64; 3]; 3]) -> Self {
        Self { coeff }
    }

    /// Matrix product `self * other`: the result applies `other` first.
    pub fn multiply(&self, other: &TransformMatrix) -> TransformMatrix {
        let a = &self.coeff;
        let b = &other.coeff;
        let mut out = [[0.0; 3]; 3];
        for (row, out_row) in out.iter_mut().enumerate() {
            for (col, cell) in out_row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| a[row][k] * b[k][col]).sum();
            }
        }
        TransformMatrix { coeff: out }
    }

    /// Composes `next` after `self`.
    pub fn then(&self, next: &TransformMatrix) -> TransformMatrix {
        next.multiply(self)
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        let t = TransformMatrix::from_rows([[1.0, 0.0, dx], [0.0, 1.0, dy], [0.0, 0.0, 1.0]]);
        *self = t.multiply(self);
    }

    pub fn scale(&mut self, sx: f64, sy: f64) {
        let s = TransformMatrix::from_rows([[sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0]]);
        *self = s.multiply(self);
    }

    pub fn rotate(&mut self, theta: f64) {
        let (sin, cos) = theta.sin_cos();
        let r = TransformMatrix::from_rows([[cos, -sin, 0.0], [sin, cos, 0.0], [0.0, 0.0, 1.0]]);
        *self = r.multiply(self);
    }

    pub fn xshear(&mut self, amount: f64) {
        let s = TransformMatrix::from_rows([[1.0, amount, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        *self = s.multiply(self);
    }

    pub fn yshear(&mut self, amount: f64) {
        let s = TransformMatrix::from_rows([[1.0, 0.0, 0.0], [amount, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        *self = s.multiply(self);
    }

    /// Rotation by `theta` radians around `center`.
    pub fn rotation_about(center: Point, theta: f64) -> TransformMatrix {
        let mut matrix = TransformMatrix::identity();
        matrix.translate(-center.x, -center.y);
        matrix.rotate(theta);
        matrix.translate(center.x, center.y);
        matrix
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.coeff;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    pub fn invert(&self) -> Result<TransformMatrix, Singular> {
        let determinant = self.determinant();
        if !determinant.is_finite() || determinant.abs() < SINGULAR_EPSILON {
            return Err(Singular { determinant });
        }
        let m = &self.coeff;
        let inv = 1.0 / determinant;
        let coeff = [
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv,
            ],
        ];
        Ok(TransformMatrix { coeff })
    }

    pub fn transform_point(&self, x: f64, y: f64) -> Point {
        let m = &self.coeff;
        let w = m[2][0] * x + m[2][1] * y + m[2][2];
        let w = if w == 0.0 { 1.0 } else { 1.0 / w };
        Point::new(
            (m[0][0] * x + m[0][1] * y + m[0][2]) * w,
            (m[1][0] * x + m[1][1] * y + m[1][2]) * w,
        )
    }

    pub fn apply(&self, point: Point) -> Point {
        self.transform_point(point.x, point.y)
    }

    pub fn is_affine(&self) -> bool {
        let m = &self.coeff;
        m[2][0].abs() < f64::EPSILON && m[2][1].abs() < f64::EPSILON && (m[2][2] - 1.0).abs() < f64::EPSILON
    }

    pub fn is_identity(&self) -> bool {
        self.coeff
            .iter()
            .flatten()
            .zip(TransformMatrix::identity().coeff.iter().flatten())
            .all(|(a, b)| (a - b).abs() < 1e-12)
    }

    pub fn is_finite(&self) -> bool {
        self.coeff.iter().flatten().all(|value| value.is_finite())
    }

    /// Maps the unit square onto `quad`, given in NW, NE, SW, SE order.
    fn square_to_quad(quad: &[Point; 4]) -> Result<TransformMatrix, Singular> {
        // Unit square corners (0,0) (1,0) (1,1) (0,1).
        let [p0, p1, p3, p2] = *quad;
        let dx = p0.x - p1.x + p2.x - p3.x;
        let dy = p0.y - p1.y + p2.y - p3.y;

        if dx == 0.0 && dy == 0.0 {
            return Ok(TransformMatrix::from_rows([
                [p1.x - p0.x, p2.x - p1.x, p0.x],
                [p1.y - p0.y, p2.y - p1.y, p0.y],
                [0.0, 0.0, 1.0],
            ]));
        }

        let dx1 = p1.x - p2.x;
        let dy1 = p1.y - p2.y;
        let dx2 = p3.x - p2.x;
        let dy2 = p3.y - p2.y;
        let den = dx1 * dy2 - dx2 * dy1;
        if den.abs() < SINGULAR_EPSILON {
            return Err(Singular { determinant: den });
        }
        let u = (dx * dy2 - dy * dx2) / den;
        let v = (dy * dx1 - dx * dy1) / den;
        Ok(TransformMatrix::from_rows([
            [p1.x - p0.x + u * p1.x, p3.x - p0.x + v * p3.x, p0.x],
            [p1.y - p0.y + u * p1.y, p3.y - p0.y + v * p3.y, p0.y],
            [u, v, 1.0],
        ]))
    }

    /// Perspective map sending the corners of `bounds` onto `quad`
    /// (NW, NE, SW, SE order).
    pub fn rect_to_quad(bounds: &ContentBounds, quad: &[Point; 4]) -> Result<TransformMatrix, Singular> {
        if bounds.is_empty() {
            return Err(Singular { determinant: 0.0 });
        }
        let mut to_unit = TransformMatrix::identity();
        to_unit.translate(-f64::from(bounds.x1), -f64::from(bounds.y1));
        to_unit.scale(1.0 / f64::from(bounds.width()), 1.0 / f64::from(bounds.height()));

        let matrix = to_unit.then(&Self::square_to_quad(quad)?);
        let determinant = matrix.determinant();
        if !determinant.is_finite() || determinant.abs() < SINGULAR_EPSILON {
            return Err(Singular { determinant });
        }
        Ok(matrix)
    }
}

pub fn identity() -> TransformMatrix {
    TransformMatrix::identity()
}

pub fn multiply(a: &TransformMatrix, b: &TransformMatrix) -> TransformMatrix {
    a.multiply(b)
}

pub fn invert(matrix: &TransformMatrix) -> Result<TransformMatrix, Singular> {
    matrix.invert()
}

pub fn transform_point(matrix: &TransformMatrix, x: f64, y: f64) -> (f64, f64) {
    let point = matrix.transform_point(x, y);
    (point.x, point.y)
}
