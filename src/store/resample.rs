//! Pixel resampling under a projective transform.

use image::{ImageBuffer, Pixel};

use super::{ClipPolicy, Interpolation, StoreError, StoreResult, TransformRequest};
use crate::geometry::{ContentBounds, Point, Singular, TransformMatrix};
use crate::handles::BoundingQuad;
use crate::progress::ProgressSink;

const EDGE_EPSILON: f64 = 1e-6;
const CROP_SEARCH_STEPS: usize = 48;

/// Extents of the transformed result for the given clip policy.
pub fn result_bounds(
    source: &ContentBounds,
    matrix: &TransformMatrix,
    clip: ClipPolicy,
) -> StoreResult<ContentBounds> {
    let corners = source.corners().map(|corner| matrix.apply(corner));
    if !corners.iter().all(|corner| corner.is_finite()) {
        return Err(Singular {
            determinant: matrix.determinant(),
        }
        .into());
    }

    let bounds = match clip {
        ClipPolicy::Clip => *source,
        ClipPolicy::Adjust => {
            let (min_x, max_x) = min_max(corners.iter().map(|corner| corner.x));
            let (min_y, max_y) = min_max(corners.iter().map(|corner| corner.y));
            ContentBounds::new(
                (min_x + EDGE_EPSILON).floor() as i32,
                (min_y + EDGE_EPSILON).floor() as i32,
                (max_x - EDGE_EPSILON).ceil() as i32,
                (max_y - EDGE_EPSILON).ceil() as i32,
            )
        }
        ClipPolicy::Crop => crop_bounds(source, corners),
    };

    if bounds.is_empty() {
        return Err(StoreError::EmptyResult);
    }
    Ok(bounds)
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), value| {
        (lo.min(value), hi.max(value))
    })
}

/// Largest rectangle with the source aspect ratio, centered on the
/// transformed quad, whose corners all stay inside the quad.
fn crop_bounds(source: &ContentBounds, corners: [Point; 4]) -> ContentBounds {
    let center = Point::new(
        corners.iter().map(|corner| corner.x).sum::<f64>() / 4.0,
        corners.iter().map(|corner| corner.y).sum::<f64>() / 4.0,
    );
    let quad = BoundingQuad {
        corners,
        pivot: center,
        center,
    };
    let half_width = f64::from(source.width()) / 2.0;
    let half_height = f64::from(source.height()) / 2.0;
    let (min_x, max_x) = min_max(corners.iter().map(|corner| corner.x));
    let (min_y, max_y) = min_max(corners.iter().map(|corner| corner.y));

    let fits = |scale: f64| {
        let dx = half_width * scale;
        let dy = half_height * scale;
        [(-dx, -dy), (dx, -dy), (-dx, dy), (dx, dy)]
            .into_iter()
            .all(|(ox, oy)| quad.contains(center.offset(ox, oy)))
    };

    let mut low = 0.0;
    let mut high = ((max_x - min_x) / (2.0 * half_width)).max((max_y - min_y) / (2.0 * half_height));
    for _ in 0..CROP_SEARCH_STEPS {
        let mid = (low + high) / 2.0;
        if fits(mid) {
            low = mid;
        } else {
            high = mid;
        }
    }

    let dx = half_width * low;
    let dy = half_height * low;
    ContentBounds::new(
        (center.x - dx - EDGE_EPSILON).ceil() as i32,
        (center.y - dy - EDGE_EPSILON).ceil() as i32,
        (center.x + dx + EDGE_EPSILON).floor() as i32,
        (center.y + dy + EDGE_EPSILON).floor() as i32,
    )
}

/// Resamples `source`, whose top-left pixel sits at `origin` in image
/// coordinates, through `request.matrix`.
///
/// Returns the new pixels together with their image-space bounds. Samples
/// falling outside the source read as fully transparent (or unselected for
/// masks). Perspective transforms are supersampled `recursion_level + 1`
/// times per axis.
pub fn transform_pixels<P>(
    source: &ImageBuffer<P, Vec<u8>>,
    origin: (i32, i32),
    request: &TransformRequest,
    progress: &mut dyn ProgressSink,
) -> StoreResult<(ImageBuffer<P, Vec<u8>>, ContentBounds)>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    if source.width() == 0 || source.height() == 0 {
        return Err(StoreError::EmptyResult);
    }
    let source_bounds =
        ContentBounds::from_origin_size(origin.0, origin.1, source.width(), source.height());
    let target = result_bounds(&source_bounds, &request.matrix, request.clip)?;
    let inverse = request.matrix.invert()?;

    let samples = if request.matrix.is_affine() || request.interpolation == Interpolation::None {
        1
    } else {
        u32::from(request.recursion_level) + 1
    };
    let sampler = Sampler {
        source,
        interpolation: request.interpolation,
    };
    let channels = usize::from(P::CHANNEL_COUNT).min(4);
    let sample_weight = f64::from(samples * samples);

    let width = target.width() as u32;
    let height = target.height() as u32;
    let mut output = ImageBuffer::<P, Vec<u8>>::new(width, height);
    tracing::debug!(
        width,
        height,
        samples,
        interpolation = ?request.interpolation,
        clip = ?request.clip,
        "resampling buffer"
    );

    for y in 0..height {
        for x in 0..width {
            let mut accumulated = [0.0f64; 4];
            for sy in 0..samples {
                for sx in 0..samples {
                    let destination = Point::new(
                        f64::from(target.x1) + f64::from(x) + (f64::from(sx) + 0.5) / f64::from(samples),
                        f64::from(target.y1) + f64::from(y) + (f64::from(sy) + 0.5) / f64::from(samples),
                    );
                    let source_point = inverse.apply(destination);
                    let value = sampler.sample(
                        source_point.x - f64::from(origin.0),
                        source_point.y - f64::from(origin.1),
                    );
                    for (total, channel) in accumulated.iter_mut().zip(value).take(channels) {
                        *total += channel;
                    }
                }
            }

            let mut averaged = accumulated.map(|total| total / sample_weight);
            if P::HAS_ALPHA {
                unpremultiply(&mut averaged[..channels]);
            }
            let mut bytes = [0u8; 4];
            for (byte, value) in bytes.iter_mut().zip(averaged).take(channels) {
                *byte = value.round().clamp(0.0, 255.0) as u8;
            }
            output.put_pixel(x, y, *P::from_slice(&bytes[..channels]));
        }
        progress.update(f64::from(y + 1) / f64::from(height));
    }

    Ok((output, target))
}

struct Sampler<'a, P: Pixel<Subpixel = u8>> {
    source: &'a ImageBuffer<P, Vec<u8>>,
    interpolation: Interpolation,
}

impl<P> Sampler<'_, P>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    /// Samples at a continuous position where pixel `i` covers `[i, i + 1)`.
    fn sample(&self, u: f64, v: f64) -> [f64; 4] {
        match self.interpolation {
            Interpolation::None => self.fetch(u.floor() as i64, v.floor() as i64),
            Interpolation::Linear => self.bilinear(u - 0.5, v - 0.5),
            Interpolation::Cubic => self.bicubic(u - 0.5, v - 0.5),
        }
    }

    fn fetch(&self, x: i64, y: i64) -> [f64; 4] {
        let mut value = [0.0; 4];
        if x < 0 || y < 0 || x >= i64::from(self.source.width()) || y >= i64::from(self.source.height()) {
            return value;
        }
        let pixel = self.source.get_pixel(x as u32, y as u32);
        let channels = pixel.channels();
        for (slot, channel) in value.iter_mut().zip(channels) {
            *slot = f64::from(*channel);
        }
        if P::HAS_ALPHA {
            premultiply(&mut value[..channels.len().min(4)]);
        }
        value
    }

    fn bilinear(&self, u: f64, v: f64) -> [f64; 4] {
        let x0 = u.floor();
        let y0 = v.floor();
        let fx = u - x0;
        let fy = v - y0;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top_left = self.fetch(x0, y0);
        let top_right = self.fetch(x0 + 1, y0);
        let bottom_left = self.fetch(x0, y0 + 1);
        let bottom_right = self.fetch(x0 + 1, y0 + 1);

        let mut value = [0.0; 4];
        for (index, slot) in value.iter_mut().enumerate() {
            let top = top_left[index] * (1.0 - fx) + top_right[index] * fx;
            let bottom = bottom_left[index] * (1.0 - fx) + bottom_right[index] * fx;
            *slot = top * (1.0 - fy) + bottom * fy;
        }
        value
    }

    fn bicubic(&self, u: f64, v: f64) -> [f64; 4] {
        let x0 = u.floor();
        let y0 = v.floor();
        let weights_x = catmull_rom_weights(u - x0);
        let weights_y = catmull_rom_weights(v - y0);
        let (x0, y0) = (x0 as i64, y0 as i64);

        let mut value = [0.0; 4];
        for (row, weight_y) in weights_y.iter().enumerate() {
            for (column, weight_x) in weights_x.iter().enumerate() {
                let texel = self.fetch(x0 + column as i64 - 1, y0 + row as i64 - 1);
                let weight = weight_x * weight_y;
                for (slot, channel) in value.iter_mut().zip(texel) {
                    *slot += channel * weight;
                }
            }
        }
        value
    }
}

/// Scales color channels by alpha, the last channel, so filtering does not
/// bleed the color of transparent texels.
fn premultiply(texel: &mut [f64]) {
    if let Some((alpha, color)) = texel.split_last_mut() {
        let coverage = *alpha / 255.0;
        for channel in color {
            *channel *= coverage;
        }
    }
}

fn unpremultiply(texel: &mut [f64]) {
    if let Some((alpha, color)) = texel.split_last_mut() {
        *alpha = alpha.clamp(0.0, 255.0);
        let coverage = *alpha / 255.0;
        for channel in color {
            *channel = if coverage > 0.0 { *channel / coverage } else { 0.0 };
        }
    }
}

fn catmull_rom_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}
