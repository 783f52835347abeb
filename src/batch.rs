use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::commit::CommitOutcome;
use crate::error::{AppError, AppResult};
use crate::geometry::{ContentBounds, Point};
use crate::handles::ViewTransform;
use crate::input::DisplayId;
use crate::progress::TracingProgress;
use crate::render::TracingRenderSink;
use crate::state::{SessionHost, TransformSession};
use crate::store::{Layer, MemoryStore, StoreError, TransformType};
use crate::tools::{
    PerspectiveTransform, RotateTransform, ScaleTransform, ToolKind, TransformOptions,
    TransformParameters, UnifiedTransform,
};

/// Explicit transform values for a non-interactive run. Coordinates are in
/// pixels of the input image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchTransform {
    /// New size, anchored at the top-left corner.
    Scale { width: f64, height: f64 },
    /// Clockwise on screen, about the image center.
    Rotate { degrees: f64 },
    /// Target corners in NW, NE, SW, SE order.
    Perspective { corners: [[f64; 2]; 4] },
    Unified {
        corners: [[f64; 2]; 4],
        pivot: [f64; 2],
    },
}

impl BatchTransform {
    pub const fn kind(&self) -> ToolKind {
        match self {
            Self::Scale { .. } => ToolKind::Scale,
            Self::Rotate { .. } => ToolKind::Rotate,
            Self::Perspective { .. } => ToolKind::Perspective,
            Self::Unified { .. } => ToolKind::Unified,
        }
    }

    fn parameters(&self, bounds: &ContentBounds) -> TransformParameters {
        match *self {
            Self::Scale { width, height } => {
                let x0 = f64::from(bounds.x1);
                let y0 = f64::from(bounds.y1);
                ScaleTransform::parameters(x0, y0, x0 + width, y0 + height)
            }
            Self::Rotate { degrees } => {
                RotateTransform::parameters(degrees.to_radians(), bounds.center())
            }
            Self::Perspective { corners } => PerspectiveTransform::parameters(&points(corners)),
            Self::Unified { corners, pivot } => {
                UnifiedTransform::parameters(&points(corners), Point::new(pivot[0], pivot[1]))
            }
        }
    }
}

fn points(corners: [[f64; 2]; 4]) -> [Point; 4] {
    corners.map(|[x, y]| Point::new(x, y))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub input: PathBuf,
    pub output: PathBuf,
    pub transform: BatchTransform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub outcome: CommitOutcome,
    /// Placement of the written image relative to the input's origin.
    pub bounds: ContentBounds,
}

/// Loads `request.input` as a single layer, transforms it with the given
/// options and writes the resulting layer to `request.output`.
pub fn transform_file(request: &BatchRequest, options: TransformOptions) -> AppResult<BatchReport> {
    let pixels = image::open(&request.input)
        .map_err(|source| AppError::Image {
            path: request.input.clone(),
            source,
        })?
        .to_rgba8();
    let (width, height) = pixels.dimensions();
    let mut store = MemoryStore::new(width, height).with_layer(Layer::new(layer_name(&request.input), pixels));

    let kind = request.transform.kind();
    let options = TransformOptions {
        target: TransformType::Layer,
        ..options
    };
    let mut session = TransformSession::start(
        kind,
        DisplayId::default(),
        ViewTransform::identity(),
        options,
        &store,
    )?;
    let params = request.transform.parameters(&session.bounds());
    if !session.set_parameters(params)? {
        return Err(AppError::DegenerateParameters { kind });
    }

    let mut progress = TracingProgress::default();
    let mut render = TracingRenderSink::default();
    let outcome = {
        let mut host = SessionHost::new(&mut store, &mut progress, &mut render);
        session.commit(&mut host)?
    };

    let layer = store
        .active_layer()
        .ok_or(StoreError::MissingTarget(TransformType::Layer))?;
    layer.pixels.save(&request.output).map_err(|source| AppError::Image {
        path: request.output.clone(),
        source,
    })?;

    let bounds = layer.bounds();
    tracing::info!(
        input = %request.input.display(),
        output = %request.output.display(),
        %kind,
        ?bounds,
        "batch transform written"
    );
    Ok(BatchReport { outcome, bounds })
}

fn layer_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Background".to_string())
}
