//! Coverage gate for keypoints on partially covered layers.
//!
//! Reprojected layers (cylindrical surfaces) carry uncovered pixels, and the
//! boundary between those and the image reads as a strong edge to the
//! detector. Candidates whose detector and descriptor support touches an
//! uncovered pixel are rejected before selection. The canvas border is left
//! to the descriptor's own bounds check.
use super::descriptor::WINDOW_REACH;
use crate::image::{ImageF32, ImageView};
use crate::pyramid::level_scale;
use crate::types::Keypoint;

/// Level pixels added to the descriptor reach for detector smoothing and
/// pyramid blur.
const SUPPORT_MARGIN: f32 = 8.0;

/// Summed-area table over the uncovered pixels of a coverage mask.
pub struct CoverageGate {
    w: usize,
    h: usize,
    // (w + 1) x (h + 1); entry (x, y) counts uncovered pixels in [0, x) x [0, y)
    sums: Vec<u64>,
}

impl CoverageGate {
    /// `None` when the mask covers every pixel.
    pub fn new(mask: &ImageF32) -> Option<Self> {
        let (w, h) = (mask.w, mask.h);
        let stride = w + 1;
        let mut sums = vec![0u64; stride * (h + 1)];
        let mut any = false;
        for y in 0..h {
            let mut acc = 0u64;
            for (x, &m) in mask.row(y).iter().enumerate() {
                if m < 0.5 {
                    acc += 1;
                    any = true;
                }
                sums[(y + 1) * stride + x + 1] = sums[y * stride + x + 1] + acc;
            }
        }
        any.then_some(Self { w, h, sums })
    }

    /// Uncovered pixels in the half-open box `[x0, x1) x [y0, y1)`, clipped
    /// to the mask.
    pub fn uncovered_in(&self, x0: i64, y0: i64, x1: i64, y1: i64) -> u64 {
        let cx = |v: i64| v.clamp(0, self.w as i64) as usize;
        let cy = |v: i64| v.clamp(0, self.h as i64) as usize;
        let (x0, x1, y0, y1) = (cx(x0), cx(x1), cy(y0), cy(y1));
        if x0 >= x1 || y0 >= y1 {
            return 0;
        }
        let stride = self.w + 1;
        let at = |x: usize, y: usize| self.sums[y * stride + x];
        at(x1, y1) + at(x0, y0) - at(x0, y1) - at(x1, y0)
    }

    /// Whether the keypoint's support, in level-0 pixels, is fully covered.
    pub fn admits(&self, kp: &Keypoint) -> bool {
        let reach = ((WINDOW_REACH + SUPPORT_MARGIN) as f64 * level_scale(kp.level)).ceil() as i64;
        let [x, y] = kp.position_l0();
        let (cx, cy) = (x.round() as i64, y.round() as i64);
        self.uncovered_in(cx - reach, cy - reach, cx + reach + 1, cy + reach + 1) == 0
    }
}

/// Keep the keypoints whose support lies on covered pixels of `mask`.
pub fn retain_covered(keypoints: Vec<Keypoint>, mask: &ImageF32) -> Vec<Keypoint> {
    match CoverageGate::new(mask) {
        Some(gate) => keypoints.into_iter().filter(|kp| gate.admits(kp)).collect(),
        None => keypoints,
    }
}
