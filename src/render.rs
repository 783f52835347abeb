use serde::{Deserialize, Serialize};

use crate::geometry::{ContentBounds, Point, TransformMatrix};
use crate::handles::{BoundingQuad, HandleSet, TransformFunction};

/// Upper bound on grid lines per axis.
pub const MAX_GRID_LINES: u32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuideKind {
    #[default]
    None,
    CenterLines,
    Thirds,
    /// `n` evenly spaced lines per axis, at most [`MAX_GRID_LINES`].
    Grid(u32),
}

/// A guide segment in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideLine {
    pub from: Point,
    pub to: Point,
}

/// Request to draw the content through the current matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewRequest {
    pub matrix: TransformMatrix,
    pub opacity: f64,
    pub perspective: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    pub quad: BoundingQuad,
    pub handles: HandleSet,
    pub highlighted: TransformFunction,
    pub guides: Vec<GuideLine>,
    pub preview: Option<PreviewRequest>,
}

/// Draws transform overlays. Implemented by the GUI layer.
pub trait RenderSink {
    fn draw(&mut self, frame: &RenderFrame);
    fn clear(&mut self);
}

/// Sink for headless sessions: logs frames at trace level.
#[derive(Debug, Default)]
pub struct TracingRenderSink {
    frames: usize,
}

impl TracingRenderSink {
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl RenderSink for TracingRenderSink {
    fn draw(&mut self, frame: &RenderFrame) {
        self.frames += 1;
        tracing::trace!(
            highlighted = ?frame.highlighted,
            handles = frame.handles.len(),
            guides = frame.guides.len(),
            preview = frame.preview.is_some(),
            "draw transform overlay"
        );
    }

    fn clear(&mut self) {
        tracing::trace!("clear transform overlay");
    }
}

/// Guide lines laid over `bounds`, mapped through `matrix`.
pub fn guide_lines(kind: GuideKind, bounds: &ContentBounds, matrix: &TransformMatrix) -> Vec<GuideLine> {
    let divisions = match kind {
        GuideKind::None => return Vec::new(),
        GuideKind::CenterLines => 2,
        GuideKind::Thirds => 3,
        GuideKind::Grid(lines) => lines.min(MAX_GRID_LINES) + 1,
    };

    let x1 = f64::from(bounds.x1);
    let y1 = f64::from(bounds.y1);
    let x2 = f64::from(bounds.x2);
    let y2 = f64::from(bounds.y2);
    let width = f64::from(bounds.width());
    let height = f64::from(bounds.height());

    let mut lines = Vec::new();
    for step in 1..divisions {
        let fraction = f64::from(step) / f64::from(divisions);
        let x = x1 + width * fraction;
        let y = y1 + height * fraction;
        lines.push(GuideLine {
            from: matrix.apply(Point::new(x, y1)),
            to: matrix.apply(Point::new(x, y2)),
        });
        lines.push(GuideLine {
            from: matrix.apply(Point::new(x1, y)),
            to: matrix.apply(Point::new(x2, y)),
        });
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guide_counts_follow_kind() {
        let bounds = ContentBounds::new(0, 0, 90, 90);
        let identity = TransformMatrix::identity();
        assert!(guide_lines(GuideKind::None, &bounds, &identity).is_empty());
        assert_eq!(guide_lines(GuideKind::CenterLines, &bounds, &identity).len(), 2);
        assert_eq!(guide_lines(GuideKind::Thirds, &bounds, &identity).len(), 4);
        assert_eq!(guide_lines(GuideKind::Grid(5), &bounds, &identity).len(), 10);
        assert!(guide_lines(GuideKind::Grid(0), &bounds, &identity).is_empty());
    }

    #[test]
    fn oversized_grid_is_capped() {
        let bounds = ContentBounds::new(0, 0, 90, 90);
        let identity = TransformMatrix::identity();
        let capped = 2 * MAX_GRID_LINES as usize;
        assert_eq!(guide_lines(GuideKind::Grid(u32::MAX), &bounds, &identity).len(), capped);
        assert_eq!(guide_lines(GuideKind::Grid(MAX_GRID_LINES + 1), &bounds, &identity).len(), capped);
    }

    #[test]
    fn guides_follow_matrix() {
        let bounds = ContentBounds::new(0, 0, 90, 60);
        let mut matrix = TransformMatrix::identity();
        matrix.translate(10.0, 20.0);
        let lines = guide_lines(GuideKind::CenterLines, &bounds, &matrix);
        assert_eq!(
            lines[0],
            GuideLine {
                from: Point::new(55.0, 20.0),
                to: Point::new(55.0, 80.0),
            }
        );
        assert_eq!(
            lines[1],
            GuideLine {
                from: Point::new(10.0, 50.0),
                to: Point::new(100.0, 50.0),
            }
        );
    }
}
