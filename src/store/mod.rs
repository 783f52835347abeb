pub mod resample;

mod memory;

use std::fmt;

use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{ContentBounds, Singular, TransformMatrix};
use crate::progress::ProgressSink;

pub use memory::{Layer, MemoryStore, UndoGroup, UndoStep, VectorPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformType {
    #[default]
    Layer,
    Selection,
    Path,
}

impl fmt::Display for TransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Layer => "layer",
            Self::Selection => "selection",
            Self::Path => "path",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformDirection {
    #[default]
    Forward,
    /// Corrective mode: the drawn quad describes where the content should
    /// come from, so the inverse is applied.
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    None,
    Linear,
    #[default]
    Cubic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipPolicy {
    /// Grow the result to the bounding box of the transformed content.
    #[default]
    Adjust,
    /// Keep the original extents.
    Clip,
    /// Crop to the largest axis-aligned rectangle inside the result.
    Crop,
}

/// Everything a store needs to resample or transform an item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformRequest {
    /// Forward mapping from source to destination coordinates, with any
    /// direction inversion already applied.
    pub matrix: TransformMatrix,
    pub interpolation: Interpolation,
    pub recursion_level: u8,
    pub clip: ClipPolicy,
}

impl TransformRequest {
    pub fn with_clip(mut self, clip: ClipPolicy) -> Self {
        self.clip = clip;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PixelBuffer {
    Rgba(RgbaImage),
    /// Single channel without alpha, as used by selection masks.
    Mask(GrayImage),
}

impl PixelBuffer {
    pub fn width(&self) -> u32 {
        match self {
            Self::Rgba(pixels) => pixels.width(),
            Self::Mask(pixels) => pixels.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Rgba(pixels) => pixels.height(),
            Self::Mask(pixels) => pixels.height(),
        }
    }

    pub const fn has_alpha(&self) -> bool {
        matches!(self, Self::Rgba(_))
    }
}

/// Pixels detached from the image, positioned in image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatingBuffer {
    pub pixels: PixelBuffer,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl FloatingBuffer {
    pub fn bounds(&self) -> ContentBounds {
        ContentBounds::from_origin_size(
            self.offset_x,
            self.offset_y,
            self.pixels.width(),
            self.pixels.height(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CutBuffer {
    pub buffer: FloatingBuffer,
    /// Whether the pasted result must become a new floating layer, which is
    /// the case unless the source layer was already isolated.
    pub new_layer: bool,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no active {0} to transform")]
    MissingTarget(TransformType),
    #[error("the active {0} is locked")]
    Locked(TransformType),
    #[error("the selection does not overlap the active layer")]
    EmptySelection,
    #[error("the transformed result has no pixels")]
    EmptyResult,
    #[error(transparent)]
    Singular(#[from] Singular),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Image model collaborator the transform engine reads from and commits to.
///
/// Bounds are in image coordinates. Pixel operations report progress through
/// the sink they are handed.
pub trait ContentStore {
    fn has_target(&self, target: TransformType) -> bool;
    fn is_locked(&self, target: TransformType) -> bool;
    fn bounds(&self, target: TransformType) -> StoreResult<ContentBounds>;
    fn selection_is_empty(&self) -> bool;

    /// Removes the selected pixels of the active layer into a buffer.
    fn cut_selection(&mut self) -> StoreResult<CutBuffer>;
    /// Copy of the selection mask as a buffer without alpha.
    fn mask_buffer(&self) -> StoreResult<FloatingBuffer>;
    fn transform_buffer(
        &mut self,
        buffer: &FloatingBuffer,
        request: &TransformRequest,
        progress: &mut dyn ProgressSink,
    ) -> StoreResult<FloatingBuffer>;
    /// Transforms an item in place: layer pixels, or path control points.
    fn transform_item(
        &mut self,
        target: TransformType,
        request: &TransformRequest,
        progress: &mut dyn ProgressSink,
    ) -> StoreResult<()>;
    fn paste(&mut self, buffer: FloatingBuffer, new_layer: bool) -> StoreResult<()>;
    fn replace_mask(&mut self, buffer: FloatingBuffer) -> StoreResult<()>;

    fn begin_undo_group(&mut self, description: &str);
    fn end_undo_group(&mut self);
    fn mark_dirty(&mut self);
    fn flush(&mut self);
}
