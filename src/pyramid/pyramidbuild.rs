use super::filters::{SeparableFilter, StaticSeparableFilter, GAUSSIAN_5TAP};
use super::options::PyramidOptions;
use crate::image::{ImageF32, ImageView, ImageViewMut};

use serde::Serialize;
use std::time::Instant;

/// Gaussian pyramid; level `l` has scale `1 / 2^l` relative to level 0.
#[derive(Clone, Debug, Default)]
pub struct Pyramid {
    pub levels: Vec<ImageF32>,
}

impl Pyramid {
    /// Build from a level-0 plane. `options.levels` is clamped to at least 1
    /// and decimation stops early once a level shrinks to a single pixel.
    pub fn build_f32(image: ImageF32, options: PyramidOptions) -> Self {
        let wanted = options.levels.max(1);
        let mut levels = Vec::with_capacity(wanted);
        levels.push(image);

        let mut horiz_cache = Vec::new();
        let mut cached_rows = Vec::new();
        for _ in 1..wanted {
            let Some(prev) = levels.last() else { break };
            if prev.w <= 1 && prev.h <= 1 {
                break;
            }
            let (nw, nh) = (prev.w.div_ceil(2), prev.h.div_ceil(2));
            let mut down = ImageF32::new(nw, nh);
            downsample_with_filter(
                prev,
                &mut down,
                GAUSSIAN_5TAP,
                &mut horiz_cache,
                &mut cached_rows,
            );
            levels.push(down);
        }

        Self { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn level(&self, index: usize) -> Option<&ImageF32> {
        self.levels.get(index)
    }
}

/// Factor mapping level-`level` coordinates back to level 0.
#[inline]
pub fn level_scale(level: usize) -> f64 {
    (1u64 << level.min(62)) as f64
}

#[derive(Clone, Debug, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PyramidResult {
    #[serde(skip)]
    pub pyramid: Pyramid,
    pub elapsed_ms: f64,
}

/// Build a pyramid from a gray plane and record how long it took.
pub fn build_pyramid(gray: ImageF32, options: PyramidOptions) -> PyramidResult {
    let start = Instant::now();
    log::debug!(
        "build_pyramid start w={} h={} levels={}",
        gray.w,
        gray.h,
        options.levels
    );
    let pyramid = Pyramid::build_f32(gray, options);
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    PyramidResult {
        pyramid,
        elapsed_ms,
    }
}

/// Blur and decimate in one pass; filtered source rows are cached so each
/// row is horizontally filtered once per level.
fn downsample_with_filter(
    src: &ImageF32,
    dst: &mut ImageF32,
    filter: StaticSeparableFilter,
    horiz_cache: &mut Vec<f32>,
    cached_rows: &mut Vec<isize>,
) {
    let taps = filter.taps();
    if src.is_empty() || dst.is_empty() || taps.is_empty() {
        return;
    }
    let radius = (taps.len() / 2) as isize;
    let taps_len = taps.len();
    let cache_width = dst.w;

    horiz_cache.clear();
    horiz_cache.resize(cache_width * taps_len, 0.0);
    cached_rows.clear();
    cached_rows.resize(taps_len, -1);

    for y in 0..dst.h {
        let center_sy = (y * 2) as isize;
        for ky in 0..taps_len {
            let sy = clamp_index(center_sy + ky as isize - radius, src.h) as isize;
            if cached_rows[ky] != sy {
                let cache_row = &mut horiz_cache[ky * cache_width..(ky + 1) * cache_width];
                filter_row_downsample(src.row(sy as usize), cache_row, taps, radius);
                cached_rows[ky] = sy;
            }
        }
        let dst_row = dst.row_mut(y);
        for (x, dst_px) in dst_row.iter_mut().enumerate() {
            *dst_px = taps
                .iter()
                .enumerate()
                .map(|(ky, &tap)| tap * horiz_cache[ky * cache_width + x])
                .sum();
        }
    }
}

fn filter_row_downsample(row: &[f32], out: &mut [f32], taps: &[f32], radius: isize) {
    for (x, dst_px) in out.iter_mut().enumerate() {
        let sx = (x * 2) as isize;
        *dst_px = taps
            .iter()
            .enumerate()
            .map(|(k, &tap)| tap * row[clamp_index(sx + k as isize - radius, row.len())])
            .sum();
    }
}

#[inline]
fn clamp_index(idx: isize, upper: usize) -> usize {
    idx.clamp(0, upper as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_halve_with_ceiling() {
        let img = ImageF32::from_fn(37, 20, |x, y| ((x + y) % 5) as f32);
        let pyr = Pyramid::build_f32(img, PyramidOptions::new(4));
        let sizes: Vec<_> = pyr.levels.iter().map(|l| (l.w, l.h)).collect();
        assert_eq!(sizes, vec![(37, 20), (19, 10), (10, 5), (5, 3)]);
    }

    #[test]
    fn blurred_decimation_preserves_constants() {
        let img = ImageF32::filled(16, 16, 0.3);
        let pyr = Pyramid::build_f32(img, PyramidOptions::new(3));
        for level in &pyr.levels {
            assert!(level.data.iter().all(|&v| (v - 0.3).abs() < 1e-6));
        }
    }

    #[test]
    fn decimation_blurs_before_sampling() {
        // a single bright column at x = 2 spreads to the neighbouring output columns
        let img = ImageF32::from_fn(8, 4, |x, _| if x == 2 { 1.0 } else { 0.0 });
        let pyr = Pyramid::build_f32(img, PyramidOptions::new(2));
        let row = pyr.levels[1].row(0).to_vec();
        assert!(row[1] > 0.0 && row[0] > 0.0);
        assert!(row[1] > row[0] && row[1] > row[2]);
        assert_eq!(row[3], 0.0);
    }

    #[test]
    fn tiny_inputs_stop_early() {
        let pyr = Pyramid::build_f32(ImageF32::filled(2, 1, 1.0), PyramidOptions::new(6));
        assert_eq!(pyr.len(), 2);
        assert_eq!(level_scale(3), 8.0);
    }
}
