//! Applies a finished transform to the image content as one undoable step.

use thiserror::Error;

use crate::geometry::{Singular, TransformMatrix};
use crate::progress::ProgressSink;
use crate::store::{
    ClipPolicy, ContentStore, Interpolation, StoreError, TransformDirection, TransformRequest,
    TransformType,
};

const NO_LAYER_MESSAGE: &str = "There is no layer to transform.";
const NO_PATH_MESSAGE: &str = "There is no path to transform.";
const LOCKED_LAYER_MESSAGE: &str = "The active layer's pixels are locked.";
const LOCKED_SELECTION_MESSAGE: &str = "The selection is locked.";
const LOCKED_PATH_MESSAGE: &str = "The active path's strokes are locked.";

pub(crate) const fn missing_target_message(target: TransformType) -> &'static str {
    match target {
        TransformType::Layer | TransformType::Selection => NO_LAYER_MESSAGE,
        TransformType::Path => NO_PATH_MESSAGE,
    }
}

pub(crate) const fn locked_target_message(target: TransformType) -> &'static str {
    match target {
        TransformType::Layer => LOCKED_LAYER_MESSAGE,
        TransformType::Selection => LOCKED_SELECTION_MESSAGE,
        TransformType::Path => LOCKED_PATH_MESSAGE,
    }
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("{message}")]
    NoTarget { message: &'static str },
    #[error("{message}")]
    Locked { message: &'static str },
    #[error("cannot apply a singular transform")]
    Singular(#[from] Singular),
    #[error("transform commit failed: {0}")]
    Store(#[from] StoreError),
}

pub type CommitResult<T> = std::result::Result<T, CommitError>;

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest<'a> {
    pub target: TransformType,
    /// Matrix as edited on screen; inverted here for backward transforms.
    pub matrix: TransformMatrix,
    pub direction: TransformDirection,
    pub interpolation: Interpolation,
    pub recursion_level: u8,
    pub clip: ClipPolicy,
    pub undo_description: &'a str,
    pub progress_label: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub target: TransformType,
    /// Whether raster or mask pixels were resampled.
    pub resampled: bool,
    /// Whether the result was pasted as a new floating layer.
    pub new_layer: bool,
}

/// Matrix that maps content forward for the given direction.
pub fn effective_matrix(
    matrix: &TransformMatrix,
    direction: TransformDirection,
) -> Result<TransformMatrix, Singular> {
    match direction {
        TransformDirection::Forward => {
            matrix.invert()?;
            Ok(*matrix)
        }
        TransformDirection::Backward => matrix.invert(),
    }
}

/// Transforms the target content inside a single undo group.
///
/// Missing or locked targets and singular matrices are refused before the
/// store is touched. Once the group is open it is always closed again, even
/// when a sub-step fails; steps already taken stay in the group.
pub fn commit_transform<S>(
    store: &mut S,
    progress: &mut dyn ProgressSink,
    request: &CommitRequest<'_>,
) -> CommitResult<CommitOutcome>
where
    S: ContentStore + ?Sized,
{
    let target = request.target;
    if !store.has_target(target) {
        tracing::warn!(%target, "commit refused: no target");
        return Err(CommitError::NoTarget {
            message: missing_target_message(target),
        });
    }
    if store.is_locked(target) {
        tracing::warn!(%target, "commit refused: target locked");
        return Err(CommitError::Locked {
            message: locked_target_message(target),
        });
    }

    let matrix = effective_matrix(&request.matrix, request.direction).map_err(|err| {
        tracing::warn!(?err, direction = ?request.direction, "commit refused: singular matrix");
        err
    })?;
    let transform = TransformRequest {
        matrix,
        interpolation: request.interpolation,
        recursion_level: request.recursion_level,
        clip: request.clip,
    };

    tracing::info!(%target, description = request.undo_description, "commit transform");
    store.begin_undo_group(request.undo_description);
    let outcome = apply_to_target(store, progress, request, &transform);
    store.end_undo_group();
    store.mark_dirty();
    store.flush();

    match &outcome {
        Ok(outcome) => tracing::debug!(?outcome, "transform committed"),
        Err(err) => tracing::warn!(?err, %target, "transform commit failed"),
    }
    outcome
}

fn apply_to_target<S>(
    store: &mut S,
    progress: &mut dyn ProgressSink,
    request: &CommitRequest<'_>,
    transform: &TransformRequest,
) -> CommitResult<CommitOutcome>
where
    S: ContentStore + ?Sized,
{
    let target = request.target;
    match target {
        TransformType::Layer if !store.selection_is_empty() => {
            let cut = store.cut_selection()?;
            let new_layer = cut.new_layer;
            let transformed = with_progress(progress, request.progress_label, |progress| {
                store.transform_buffer(&cut.buffer, transform, progress)
            })?;
            store.paste(transformed, new_layer)?;
            Ok(CommitOutcome {
                target,
                resampled: true,
                new_layer,
            })
        }
        TransformType::Layer => {
            with_progress(progress, request.progress_label, |progress| {
                store.transform_item(target, transform, progress)
            })?;
            Ok(CommitOutcome {
                target,
                resampled: true,
                new_layer: false,
            })
        }
        TransformType::Selection => {
            let mask = store.mask_buffer()?;
            let channel_request = transform.with_clip(ClipPolicy::Clip);
            let transformed = with_progress(progress, request.progress_label, |progress| {
                store.transform_buffer(&mask, &channel_request, progress)
            })?;
            store.replace_mask(transformed)?;
            Ok(CommitOutcome {
                target,
                resampled: true,
                new_layer: false,
            })
        }
        TransformType::Path => {
            store.transform_item(target, transform, progress)?;
            Ok(CommitOutcome {
                target,
                resampled: false,
                new_layer: false,
            })
        }
    }
}

fn with_progress<T>(
    progress: &mut dyn ProgressSink,
    label: &str,
    work: impl FnOnce(&mut dyn ProgressSink) -> T,
) -> T {
    progress.start(label);
    let result = work(&mut *progress);
    progress.end();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ContentBounds, Point};
    use crate::progress::TracingProgress;
    use crate::store::{CutBuffer, FloatingBuffer, Layer, MemoryStore, UndoStep, VectorPath};
    use image::{Rgba, RgbaImage};

    #[derive(Debug, Default)]
    struct RecordingProgress {
        events: Vec<String>,
    }

    impl ProgressSink for RecordingProgress {
        fn start(&mut self, label: &str) {
            self.events.push(format!("start:{label}"));
        }

        fn update(&mut self, _fraction: f64) {}

        fn end(&mut self) {
            self.events.push("end".to_string());
        }
    }

    /// Delegates to a `MemoryStore` but fails every paste.
    struct FailingPasteStore {
        inner: MemoryStore,
    }

    impl ContentStore for FailingPasteStore {
        fn has_target(&self, target: TransformType) -> bool {
            self.inner.has_target(target)
        }
        fn is_locked(&self, target: TransformType) -> bool {
            self.inner.is_locked(target)
        }
        fn bounds(&self, target: TransformType) -> crate::store::StoreResult<ContentBounds> {
            self.inner.bounds(target)
        }
        fn selection_is_empty(&self) -> bool {
            self.inner.selection_is_empty()
        }
        fn cut_selection(&mut self) -> crate::store::StoreResult<CutBuffer> {
            self.inner.cut_selection()
        }
        fn mask_buffer(&self) -> crate::store::StoreResult<FloatingBuffer> {
            self.inner.mask_buffer()
        }
        fn transform_buffer(
            &mut self,
            buffer: &FloatingBuffer,
            request: &TransformRequest,
            progress: &mut dyn ProgressSink,
        ) -> crate::store::StoreResult<FloatingBuffer> {
            self.inner.transform_buffer(buffer, request, progress)
        }
        fn transform_item(
            &mut self,
            target: TransformType,
            request: &TransformRequest,
            progress: &mut dyn ProgressSink,
        ) -> crate::store::StoreResult<()> {
            self.inner.transform_item(target, request, progress)
        }
        fn paste(&mut self, _buffer: FloatingBuffer, _new_layer: bool) -> crate::store::StoreResult<()> {
            Err(StoreError::EmptyResult)
        }
        fn replace_mask(&mut self, buffer: FloatingBuffer) -> crate::store::StoreResult<()> {
            self.inner.replace_mask(buffer)
        }
        fn begin_undo_group(&mut self, description: &str) {
            self.inner.begin_undo_group(description);
        }
        fn end_undo_group(&mut self) {
            self.inner.end_undo_group();
        }
        fn mark_dirty(&mut self) {
            self.inner.mark_dirty();
        }
        fn flush(&mut self) {
            self.inner.flush();
        }
    }

    fn doubling_matrix() -> TransformMatrix {
        let mut matrix = TransformMatrix::identity();
        matrix.translate(-50.0, -50.0);
        matrix.scale(2.0, 2.0);
        matrix.translate(50.0, 50.0);
        matrix
    }

    fn request(target: TransformType, matrix: TransformMatrix) -> CommitRequest<'static> {
        CommitRequest {
            target,
            matrix,
            direction: TransformDirection::Forward,
            interpolation: Interpolation::None,
            recursion_level: 0,
            clip: ClipPolicy::Adjust,
            undo_description: "Scale",
            progress_label: "Scaling",
        }
    }

    fn layer_store() -> MemoryStore {
        MemoryStore::new(100, 100).with_layer(Layer::new(
            "Background",
            RgbaImage::from_pixel(100, 100, Rgba([200, 10, 10, 255])),
        ))
    }

    #[test]
    fn whole_layer_commit_resamples_inside_one_group() {
        let mut store = layer_store();
        let mut progress = RecordingProgress::default();

        let outcome = commit_transform(&mut store, &mut progress, &request(TransformType::Layer, doubling_matrix()))
            .expect("layer commit");
        assert_eq!(
            outcome,
            CommitOutcome {
                target: TransformType::Layer,
                resampled: true,
                new_layer: false,
            }
        );
        let layer = store.active_layer().expect("layer");
        assert_eq!(layer.bounds(), ContentBounds::new(-50, -50, 150, 150));
        assert_eq!(store.undo_log().len(), 1);
        assert_eq!(store.undo_log()[0].description, "Scale");
        assert_eq!(store.undo_log()[0].steps, vec![UndoStep::TransformItem(TransformType::Layer)]);
        assert!(store.is_dirty());
        assert_eq!(store.flush_count(), 1);
        assert_eq!(progress.events, vec!["start:Scaling".to_string(), "end".to_string()]);
    }

    #[test]
    fn selection_on_layer_cuts_transforms_and_pastes_new_layer() {
        let mut store = layer_store();
        store.select_rect(ContentBounds::new(10, 10, 20, 20));
        let mut progress = TracingProgress::default();
        let mut shift = TransformMatrix::identity();
        shift.translate(30.0, 0.0);

        let outcome = commit_transform(&mut store, &mut progress, &request(TransformType::Layer, shift))
            .expect("selection commit");
        assert!(outcome.new_layer);
        assert_eq!(store.layers().len(), 2);
        let pasted = store.active_layer().expect("pasted layer");
        assert_eq!(pasted.bounds(), ContentBounds::new(40, 10, 50, 20));
        assert_eq!(
            store.undo_log()[0].steps,
            vec![UndoStep::Cut { layer: 0 }, UndoStep::Paste { new_layer: true }]
        );
    }

    #[test]
    fn selection_target_keeps_mask_extents() {
        let mut store = MemoryStore::new(100, 100);
        store.select_rect(ContentBounds::new(25, 25, 75, 75));
        let mut progress = TracingProgress::default();

        commit_transform(&mut store, &mut progress, &request(TransformType::Selection, doubling_matrix()))
            .expect("selection commit");
        let mask = store.selection().expect("selection mask");
        assert_eq!(mask.dimensions(), (100, 100));
        assert_eq!(
            store.bounds(TransformType::Selection).expect("selection bounds"),
            ContentBounds::new(0, 0, 100, 100)
        );
        assert_eq!(store.undo_log()[0].steps, vec![UndoStep::ReplaceMask]);
    }

    #[test]
    fn path_commit_moves_points_without_resampling() {
        let path = VectorPath::new("outline", vec![vec![Point::new(0.0, 0.0), Point::new(100.0, 100.0)]]);
        let mut store = layer_store().with_path(path);
        let before = store.active_layer().expect("layer").clone();
        let mut progress = RecordingProgress::default();

        let outcome = commit_transform(&mut store, &mut progress, &request(TransformType::Path, doubling_matrix()))
            .expect("path commit");
        assert!(!outcome.resampled);
        assert_eq!(store.resample_count(), 0);
        assert_eq!(store.active_layer().expect("layer"), &before);
        assert_eq!(store.active_path().expect("path").strokes[0][1], Point::new(150.0, 150.0));
        assert!(progress.events.is_empty());
    }

    #[test]
    fn backward_direction_applies_inverse() {
        let mut store = MemoryStore::new(100, 100)
            .with_path(VectorPath::new("p", vec![vec![Point::new(150.0, 150.0)]]));
        let mut progress = TracingProgress::default();
        let backward = CommitRequest {
            direction: TransformDirection::Backward,
            ..request(TransformType::Path, doubling_matrix())
        };
        commit_transform(&mut store, &mut progress, &backward).expect("backward commit");
        let point = store.active_path().expect("path").strokes[0][0];
        assert!((point.x - 100.0).abs() < 1e-9);
        assert!((point.y - 100.0).abs() < 1e-9);
    }

    #[test]
    fn locked_or_missing_target_is_refused_before_any_undo_group() {
        let mut store = MemoryStore::new(10, 10).with_layer(Layer::new("locked", RgbaImage::new(10, 10)).locked());
        let mut progress = TracingProgress::default();
        let err = commit_transform(&mut store, &mut progress, &request(TransformType::Layer, doubling_matrix()))
            .expect_err("locked layer should be refused");
        assert!(matches!(err, CommitError::Locked { .. }));
        assert_eq!(err.to_string(), LOCKED_LAYER_MESSAGE);

        let err = commit_transform(&mut store, &mut progress, &request(TransformType::Path, doubling_matrix()))
            .expect_err("missing path should be refused");
        assert!(matches!(err, CommitError::NoTarget { .. }));
        assert!(store.undo_log().is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn singular_matrix_is_refused() {
        let mut store = layer_store();
        let mut progress = TracingProgress::default();
        let mut flat = TransformMatrix::identity();
        flat.scale(1.0, 0.0);
        let err = commit_transform(&mut store, &mut progress, &request(TransformType::Layer, flat))
            .expect_err("singular should be refused");
        assert!(matches!(err, CommitError::Singular(_)));
        assert!(store.undo_log().is_empty());
    }

    #[test]
    fn failed_sub_step_still_closes_undo_group() {
        let mut inner = layer_store();
        inner.select_rect(ContentBounds::new(0, 0, 10, 10));
        let mut store = FailingPasteStore { inner };
        let mut progress = RecordingProgress::default();

        let err = commit_transform(&mut store, &mut progress, &request(TransformType::Layer, doubling_matrix()))
            .expect_err("paste failure should surface");
        assert!(matches!(err, CommitError::Store(StoreError::EmptyResult)));
        assert!(!store.inner.has_open_undo_group());
        assert_eq!(store.inner.undo_log().len(), 1);
        assert_eq!(store.inner.undo_log()[0].steps, vec![UndoStep::Cut { layer: 0 }]);
        assert_eq!(progress.events, vec!["start:Scaling".to_string(), "end".to_string()]);
    }
}
