use image::{DynamicImage, GrayImage, Luma, RgbaImage};

use super::resample::transform_pixels;
use super::{
    ClipPolicy, ContentStore, CutBuffer, FloatingBuffer, PixelBuffer, StoreError, StoreResult,
    TransformRequest, TransformType,
};
use crate::geometry::{ContentBounds, Point};
use crate::progress::ProgressSink;

const PASTED_LAYER_NAME: &str = "Transformation";

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub pixels: RgbaImage,
    pub offset_x: i32,
    pub offset_y: i32,
    pub locked: bool,
    /// Isolated layer that a transformed selection can replace directly.
    pub floating: bool,
}

impl Layer {
    pub fn new(name: impl Into<String>, pixels: RgbaImage) -> Self {
        Self {
            name: name.into(),
            pixels,
            offset_x: 0,
            offset_y: 0,
            locked: false,
            floating: false,
        }
    }

    pub fn with_offset(mut self, offset_x: i32, offset_y: i32) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

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
pub struct VectorPath {
    pub name: String,
    pub strokes: Vec<Vec<Point>>,
    pub locked: bool,
}

impl VectorPath {
    pub fn new(name: impl Into<String>, strokes: Vec<Vec<Point>>) -> Self {
        Self {
            name: name.into(),
            strokes,
            locked: false,
        }
    }

    pub fn bounds(&self) -> Option<ContentBounds> {
        let mut points = self.strokes.iter().flatten();
        let first = points.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for point in points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Some(ContentBounds::new(
            min_x.floor() as i32,
            min_y.floor() as i32,
            max_x.ceil() as i32,
            max_y.ceil() as i32,
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UndoStep {
    Cut { layer: usize },
    Paste { new_layer: bool },
    ReplaceMask,
    TransformItem(TransformType),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UndoGroup {
    pub description: String,
    pub steps: Vec<UndoStep>,
}

/// In-memory image with layers, a selection mask and vector paths.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    width: u32,
    height: u32,
    layers: Vec<Layer>,
    active_layer: Option<usize>,
    selection: Option<GrayImage>,
    selection_locked: bool,
    paths: Vec<VectorPath>,
    active_path: Option<usize>,
    undo_log: Vec<UndoGroup>,
    open_group: Option<UndoGroup>,
    dirty: bool,
    flush_count: usize,
    resample_count: usize,
}

impl MemoryStore {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: Vec::new(),
            active_layer: None,
            selection: None,
            selection_locked: false,
            paths: Vec::new(),
            active_path: None,
            undo_log: Vec::new(),
            open_group: None,
            dirty: false,
            flush_count: 0,
            resample_count: 0,
        }
    }

    /// Adds a layer and makes it active.
    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.add_layer(layer);
        self
    }

    pub fn with_path(mut self, path: VectorPath) -> Self {
        self.paths.push(path);
        self.active_path = Some(self.paths.len() - 1);
        self
    }

    pub fn add_layer(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        let index = self.layers.len() - 1;
        self.active_layer = Some(index);
        index
    }

    pub fn set_active_layer(&mut self, index: Option<usize>) {
        self.active_layer = index.filter(|index| *index < self.layers.len());
    }

    pub fn set_selection(&mut self, mask: GrayImage) {
        self.selection = Some(mask);
    }

    /// Replaces the selection with a fully selected rectangle.
    pub fn select_rect(&mut self, rect: ContentBounds) {
        let mut mask = GrayImage::new(self.width, self.height);
        for (x, y, pixel) in mask.enumerate_pixels_mut() {
            let (x, y) = (x as i32, y as i32);
            if x >= rect.x1 && x < rect.x2 && y >= rect.y1 && y < rect.y2 {
                *pixel = Luma([u8::MAX]);
            }
        }
        self.selection = Some(mask);
    }

    pub fn set_selection_locked(&mut self, locked: bool) {
        self.selection_locked = locked;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn active_layer(&self) -> Option<&Layer> {
        self.active_layer.and_then(|index| self.layers.get(index))
    }

    pub fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    pub fn selection(&self) -> Option<&GrayImage> {
        self.selection.as_ref()
    }

    pub fn active_path(&self) -> Option<&VectorPath> {
        self.active_path.and_then(|index| self.paths.get(index))
    }

    pub fn undo_log(&self) -> &[UndoGroup] {
        &self.undo_log
    }

    pub fn has_open_undo_group(&self) -> bool {
        self.open_group.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    /// Number of pixel resampling passes performed so far.
    pub fn resample_count(&self) -> usize {
        self.resample_count
    }

    fn selection_bounds(&self) -> Option<ContentBounds> {
        let mask = self.selection.as_ref()?;
        let mut bounds: Option<ContentBounds> = None;
        for (x, y, pixel) in mask.enumerate_pixels() {
            if pixel[0] == 0 {
                continue;
            }
            let (x, y) = (x as i32, y as i32);
            bounds = Some(match bounds {
                Some(b) => ContentBounds::new(b.x1.min(x), b.y1.min(y), b.x2.max(x + 1), b.y2.max(y + 1)),
                None => ContentBounds::new(x, y, x + 1, y + 1),
            });
        }
        bounds
    }

    fn image_bounds(&self) -> ContentBounds {
        ContentBounds::from_origin_size(0, 0, self.width, self.height)
    }

    fn active_layer_index(&self) -> StoreResult<usize> {
        self.active_layer
            .filter(|index| *index < self.layers.len())
            .ok_or(StoreError::MissingTarget(TransformType::Layer))
    }

    fn active_path_index(&self) -> StoreResult<usize> {
        self.active_path
            .filter(|index| *index < self.paths.len())
            .ok_or(StoreError::MissingTarget(TransformType::Path))
    }

    fn record(&mut self, step: UndoStep) {
        tracing::debug!(step = ?step, "record undo step");
        match self.open_group.as_mut() {
            Some(group) => group.steps.push(step),
            None => self.undo_log.push(UndoGroup {
                description: String::new(),
                steps: vec![step],
            }),
        }
    }

    fn transform_mask(&mut self, request: &TransformRequest, progress: &mut dyn ProgressSink) -> StoreResult<()> {
        let buffer = self.mask_buffer()?;
        let transformed = self.transform_buffer(&buffer, &request.with_clip(ClipPolicy::Clip), progress)?;
        self.write_mask(&transformed);
        Ok(())
    }

    fn write_mask(&mut self, buffer: &FloatingBuffer) {
        let mut mask = GrayImage::new(self.width, self.height);
        for (x, y, pixel) in mask.enumerate_pixels_mut() {
            let local_x = x as i64 - i64::from(buffer.offset_x);
            let local_y = y as i64 - i64::from(buffer.offset_y);
            if local_x < 0
                || local_y < 0
                || local_x >= i64::from(buffer.pixels.width())
                || local_y >= i64::from(buffer.pixels.height())
            {
                continue;
            }
            let (local_x, local_y) = (local_x as u32, local_y as u32);
            let value = match &buffer.pixels {
                PixelBuffer::Mask(source) => source.get_pixel(local_x, local_y)[0],
                PixelBuffer::Rgba(source) => source.get_pixel(local_x, local_y)[3],
            };
            *pixel = Luma([value]);
        }
        self.selection = Some(mask);
    }
}

impl ContentStore for MemoryStore {
    fn has_target(&self, target: TransformType) -> bool {
        match target {
            TransformType::Layer => self.active_layer_index().is_ok(),
            TransformType::Selection => true,
            TransformType::Path => self.active_path_index().is_ok(),
        }
    }

    fn is_locked(&self, target: TransformType) -> bool {
        match target {
            TransformType::Layer => self.active_layer().is_some_and(|layer| layer.locked),
            TransformType::Selection => self.selection_locked,
            TransformType::Path => self.active_path().is_some_and(|path| path.locked),
        }
    }

    fn bounds(&self, target: TransformType) -> StoreResult<ContentBounds> {
        match target {
            TransformType::Layer => {
                let layer = &self.layers[self.active_layer_index()?];
                let layer_bounds = layer.bounds();
                Ok(match self.selection_bounds() {
                    Some(selected) => ContentBounds::new(
                        layer_bounds.x1.max(selected.x1),
                        layer_bounds.y1.max(selected.y1),
                        layer_bounds.x2.min(selected.x2),
                        layer_bounds.y2.min(selected.y2),
                    ),
                    None => layer_bounds,
                })
            }
            TransformType::Selection => Ok(self.selection_bounds().unwrap_or_else(|| self.image_bounds())),
            TransformType::Path => {
                let path = &self.paths[self.active_path_index()?];
                Ok(path.bounds().unwrap_or_else(|| self.image_bounds()))
            }
        }
    }

    fn selection_is_empty(&self) -> bool {
        self.selection_bounds().is_none()
    }

    fn cut_selection(&mut self) -> StoreResult<CutBuffer> {
        let index = self.active_layer_index()?;
        let selected = self.selection_bounds().ok_or(StoreError::EmptySelection)?;
        let layer_bounds = self.layers[index].bounds();
        let region = ContentBounds::new(
            layer_bounds.x1.max(selected.x1),
            layer_bounds.y1.max(selected.y1),
            layer_bounds.x2.min(selected.x2),
            layer_bounds.y2.min(selected.y2),
        );
        if region.is_empty() {
            return Err(StoreError::EmptySelection);
        }

        let mask = self.selection.as_ref().ok_or(StoreError::EmptySelection)?;
        let layer = &mut self.layers[index];
        let mut cut = RgbaImage::new(region.width() as u32, region.height() as u32);
        for (x, y, target) in cut.enumerate_pixels_mut() {
            let image_x = region.x1 + x as i32;
            let image_y = region.y1 + y as i32;
            let coverage = mask
                .get_pixel_checked(image_x as u32, image_y as u32)
                .map_or(0, |pixel| pixel[0]);
            if coverage == 0 {
                continue;
            }
            let local_x = (image_x - layer.offset_x) as u32;
            let local_y = (image_y - layer.offset_y) as u32;
            let source = layer.pixels.get_pixel_mut(local_x, local_y);
            let taken = (u16::from(source[3]) * u16::from(coverage) / u16::from(u8::MAX)) as u8;
            let mut moved = *source;
            moved[3] = taken;
            *target = moved;
            source[3] -= taken;
        }

        let new_layer = !layer.floating;
        self.record(UndoStep::Cut { layer: index });
        Ok(CutBuffer {
            buffer: FloatingBuffer {
                pixels: PixelBuffer::Rgba(cut),
                offset_x: region.x1,
                offset_y: region.y1,
            },
            new_layer,
        })
    }

    fn mask_buffer(&self) -> StoreResult<FloatingBuffer> {
        let mask = self
            .selection
            .clone()
            .unwrap_or_else(|| GrayImage::new(self.width, self.height));
        Ok(FloatingBuffer {
            pixels: PixelBuffer::Mask(mask),
            offset_x: 0,
            offset_y: 0,
        })
    }

    fn transform_buffer(
        &mut self,
        buffer: &FloatingBuffer,
        request: &TransformRequest,
        progress: &mut dyn ProgressSink,
    ) -> StoreResult<FloatingBuffer> {
        let origin = (buffer.offset_x, buffer.offset_y);
        self.resample_count += 1;
        let (pixels, bounds) = match &buffer.pixels {
            PixelBuffer::Rgba(source) => {
                let (pixels, bounds) = transform_pixels(source, origin, request, progress)?;
                (PixelBuffer::Rgba(pixels), bounds)
            }
            PixelBuffer::Mask(source) => {
                let request = request.with_clip(ClipPolicy::Clip);
                let (pixels, bounds) = transform_pixels(source, origin, &request, progress)?;
                (PixelBuffer::Mask(pixels), bounds)
            }
        };
        Ok(FloatingBuffer {
            pixels,
            offset_x: bounds.x1,
            offset_y: bounds.y1,
        })
    }

    fn transform_item(
        &mut self,
        target: TransformType,
        request: &TransformRequest,
        progress: &mut dyn ProgressSink,
    ) -> StoreResult<()> {
        match target {
            TransformType::Layer => {
                let index = self.active_layer_index()?;
                let layer = &self.layers[index];
                let (pixels, bounds) =
                    transform_pixels(&layer.pixels, (layer.offset_x, layer.offset_y), request, progress)?;
                self.resample_count += 1;
                let layer = &mut self.layers[index];
                layer.pixels = pixels;
                layer.offset_x = bounds.x1;
                layer.offset_y = bounds.y1;
            }
            TransformType::Selection => self.transform_mask(request, progress)?,
            TransformType::Path => {
                let index = self.active_path_index()?;
                for point in self.paths[index].strokes.iter_mut().flatten() {
                    *point = request.matrix.apply(*point);
                }
            }
        }
        self.record(UndoStep::TransformItem(target));
        Ok(())
    }

    fn paste(&mut self, buffer: FloatingBuffer, new_layer: bool) -> StoreResult<()> {
        let pixels = match buffer.pixels {
            PixelBuffer::Rgba(pixels) => pixels,
            PixelBuffer::Mask(mask) => DynamicImage::ImageLuma8(mask).to_rgba8(),
        };
        if new_layer {
            let mut layer = Layer::new(PASTED_LAYER_NAME, pixels).with_offset(buffer.offset_x, buffer.offset_y);
            layer.floating = true;
            self.add_layer(layer);
        } else {
            let index = self.active_layer_index()?;
            let layer = &mut self.layers[index];
            layer.pixels = pixels;
            layer.offset_x = buffer.offset_x;
            layer.offset_y = buffer.offset_y;
        }
        self.record(UndoStep::Paste { new_layer });
        Ok(())
    }

    fn replace_mask(&mut self, buffer: FloatingBuffer) -> StoreResult<()> {
        self.write_mask(&buffer);
        self.record(UndoStep::ReplaceMask);
        Ok(())
    }

    fn begin_undo_group(&mut self, description: &str) {
        if self.open_group.is_some() {
            tracing::warn!(description, "undo group already open; nesting into it");
            return;
        }
        self.open_group = Some(UndoGroup {
            description: description.to_string(),
            steps: Vec::new(),
        });
    }

    fn end_undo_group(&mut self) {
        if let Some(group) = self.open_group.take() {
            tracing::debug!(description = %group.description, steps = group.steps.len(), "close undo group");
            self.undo_log.push(group);
        }
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn flush(&mut self) {
        self.flush_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TransformMatrix;
    use crate::progress::TracingProgress;
    use crate::store::Interpolation;
    use image::Rgba;

    fn opaque_layer(width: u32, height: u32) -> Layer {
        Layer::new("Background", RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 255])))
    }

    fn translation(dx: f64, dy: f64) -> TransformRequest {
        let mut matrix = TransformMatrix::identity();
        matrix.translate(dx, dy);
        TransformRequest {
            matrix,
            interpolation: Interpolation::None,
            recursion_level: 0,
            clip: ClipPolicy::Adjust,
        }
    }

    #[test]
    fn layer_bounds_intersect_selection() {
        let mut store = MemoryStore::new(100, 100).with_layer(opaque_layer(50, 50).with_offset(10, 10));
        assert_eq!(store.bounds(TransformType::Layer).expect("layer bounds"), ContentBounds::new(10, 10, 60, 60));

        store.select_rect(ContentBounds::new(40, 0, 90, 30));
        assert!(!store.selection_is_empty());
        assert_eq!(store.bounds(TransformType::Layer).expect("masked bounds"), ContentBounds::new(40, 10, 60, 30));
        assert_eq!(
            store.bounds(TransformType::Selection).expect("selection bounds"),
            ContentBounds::new(40, 0, 90, 30)
        );
    }

    #[test]
    fn empty_selection_falls_back_to_whole_image() {
        let store = MemoryStore::new(64, 32);
        assert!(store.selection_is_empty());
        assert_eq!(
            store.bounds(TransformType::Selection).expect("selection bounds"),
            ContentBounds::new(0, 0, 64, 32)
        );
        assert!(!store.has_target(TransformType::Layer));
        assert!(matches!(
            store.bounds(TransformType::Layer),
            Err(StoreError::MissingTarget(TransformType::Layer))
        ));
    }

    #[test]
    fn cut_moves_selected_pixels_out_of_layer() {
        let mut store = MemoryStore::new(20, 20).with_layer(opaque_layer(20, 20));
        store.select_rect(ContentBounds::new(5, 5, 10, 10));

        let cut = store.cut_selection().expect("cut selection");
        assert!(cut.new_layer);
        assert_eq!(cut.buffer.bounds(), ContentBounds::new(5, 5, 10, 10));

        let layer = store.active_layer().expect("active layer");
        assert_eq!(layer.pixels.get_pixel(6, 6)[3], 0);
        assert_eq!(layer.pixels.get_pixel(1, 1)[3], 255);
        assert_eq!(store.undo_log(), &[UndoGroup { description: String::new(), steps: vec![UndoStep::Cut { layer: 0 }] }]);
    }

    #[test]
    fn paste_creates_floating_layer_or_replaces_isolated_one() {
        let mut store = MemoryStore::new(20, 20).with_layer(opaque_layer(4, 4));
        let buffer = FloatingBuffer {
            pixels: PixelBuffer::Rgba(RgbaImage::new(2, 2)),
            offset_x: 3,
            offset_y: 4,
        };

        store.paste(buffer.clone(), true).expect("paste as new layer");
        assert_eq!(store.layers().len(), 2);
        let pasted = store.active_layer().expect("pasted layer");
        assert!(pasted.floating);
        assert_eq!(pasted.bounds(), ContentBounds::new(3, 4, 5, 6));

        store.paste(buffer, false).expect("paste into active layer");
        assert_eq!(store.layers().len(), 2);
    }

    #[test]
    fn transform_item_translates_layer_and_path() {
        let path = VectorPath::new("outline", vec![vec![Point::new(1.0, 1.0), Point::new(4.0, 2.0)]]);
        let mut store = MemoryStore::new(20, 20).with_layer(opaque_layer(4, 4)).with_path(path);
        let mut progress = TracingProgress::default();

        store
            .transform_item(TransformType::Layer, &translation(5.0, 6.0), &mut progress)
            .expect("transform layer");
        let layer = store.active_layer().expect("layer");
        assert_eq!(layer.bounds(), ContentBounds::new(5, 6, 9, 10));

        store
            .transform_item(TransformType::Path, &translation(1.0, 1.0), &mut progress)
            .expect("transform path");
        let path = store.active_path().expect("path");
        assert_eq!(path.strokes[0][1], Point::new(5.0, 3.0));
        assert_eq!(store.resample_count(), 1);
    }

    #[test]
    fn mask_transform_always_keeps_image_extents() {
        let mut store = MemoryStore::new(10, 10);
        store.select_rect(ContentBounds::new(0, 0, 4, 4));
        let mask = store.mask_buffer().expect("mask buffer");
        assert!(!mask.pixels.has_alpha());

        let mut progress = TracingProgress::default();
        let moved = store
            .transform_buffer(&mask, &translation(3.0, 3.0), &mut progress)
            .expect("transform mask");
        assert_eq!(moved.bounds(), ContentBounds::new(0, 0, 10, 10));

        store.replace_mask(moved).expect("replace mask");
        assert_eq!(
            store.bounds(TransformType::Selection).expect("selection bounds"),
            ContentBounds::new(3, 3, 7, 7)
        );
    }

    #[test]
    fn undo_groups_collect_steps_between_begin_and_end() {
        let mut store = MemoryStore::new(10, 10).with_layer(opaque_layer(10, 10));
        store.begin_undo_group("Scale");
        assert!(store.has_open_undo_group());
        store.select_rect(ContentBounds::new(0, 0, 2, 2));
        let cut = store.cut_selection().expect("cut");
        store.paste(cut.buffer, cut.new_layer).expect("paste");
        store.end_undo_group();
        store.mark_dirty();
        store.flush();

        assert!(!store.has_open_undo_group());
        assert_eq!(store.undo_log().len(), 1);
        assert_eq!(store.undo_log()[0].description, "Scale");
        assert_eq!(
            store.undo_log()[0].steps,
            vec![UndoStep::Cut { layer: 0 }, UndoStep::Paste { new_layer: true }]
        );
        assert!(store.is_dirty());
        assert_eq!(store.flush_count(), 1);
    }

    #[test]
    fn locks_are_reported_per_target() {
        let mut path = VectorPath::new("p", vec![vec![Point::new(0.0, 0.0)]]);
        path.locked = true;
        let mut store = MemoryStore::new(4, 4).with_layer(opaque_layer(4, 4).locked()).with_path(path);
        assert!(store.is_locked(TransformType::Layer));
        assert!(store.is_locked(TransformType::Path));
        assert!(!store.is_locked(TransformType::Selection));
        store.set_selection_locked(true);
        assert!(store.is_locked(TransformType::Selection));
    }
}
