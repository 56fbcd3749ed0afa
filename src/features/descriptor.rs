//! Multi-scale oriented patch (MOPS) descriptors.
//!
//! A 40×40 window around the keypoint, rotated to its orientation, is sampled
//! on an 8×8 grid with 5 px spacing. Sampling needs the window low-passed
//! first: when the pyramid has a level two octaves coarser, its pixels are
//! already blurred and decimated by 4, so the grid is read from there at
//! 1.25 px spacing; otherwise the keypoint's level is blurred once with
//! σ = 2.5 and sampled directly.
use crate::error::{Result, StitchError};
use crate::image::{bilinear_clamped, ImageF32};
use crate::pyramid::{gaussian_blur, Pyramid};
use crate::types::{Descriptor, Keypoint, DESCRIPTOR_LEN};

use std::borrow::Cow;

const GRID: usize = 8;
const SPACING: f32 = 5.0;
const HALF_WINDOW: f32 = 20.0;
const FALLBACK_SIGMA: f32 = 2.5;
const OCTAVE_SKIP: usize = 2;

/// Farthest level pixel a rotated window can reach from its centre.
pub(crate) const WINDOW_REACH: f32 = HALF_WINDOW * std::f32::consts::SQRT_2;

/// Per-level sampling source, built once per pyramid.
pub struct MopsExtractor<'a> {
    pyramid: &'a Pyramid,
    sources: Vec<Cow<'a, ImageF32>>,
    scales: Vec<f32>,
}

impl<'a> MopsExtractor<'a> {
    pub fn new(pyramid: &'a Pyramid) -> Self {
        let n = pyramid.levels.len();
        let mut sources = Vec::with_capacity(n);
        let mut scales = Vec::with_capacity(n);
        for l in 0..n {
            if l + OCTAVE_SKIP < n {
                sources.push(Cow::Borrowed(&pyramid.levels[l + OCTAVE_SKIP]));
                scales.push(1.0 / (1 << OCTAVE_SKIP) as f32);
            } else {
                sources.push(Cow::Owned(gaussian_blur(&pyramid.levels[l], FALLBACK_SIGMA)));
                scales.push(1.0);
            }
        }
        Self {
            pyramid,
            sources,
            scales,
        }
    }

    /// Describe one keypoint, or `OutOfBounds` if the rotated window leaves
    /// its level.
    pub fn describe(&self, kp: &Keypoint) -> Result<Descriptor> {
        let level = self.pyramid.levels.get(kp.level).ok_or_else(|| {
            StitchError::InvalidInput(format!(
                "keypoint level {} outside pyramid of {} levels",
                kp.level,
                self.pyramid.levels.len()
            ))
        })?;
        let (sin, cos) = kp.orientation.sin_cos();
        let rotate = |u: f32, v: f32| (kp.x + cos * u - sin * v, kp.y + sin * u + cos * v);

        let max_x = level.w as f32 - 1.0;
        let max_y = level.h as f32 - 1.0;
        for (u, v) in [
            (-HALF_WINDOW, -HALF_WINDOW),
            (HALF_WINDOW, -HALF_WINDOW),
            (HALF_WINDOW, HALF_WINDOW),
            (-HALF_WINDOW, HALF_WINDOW),
        ] {
            let (x, y) = rotate(u, v);
            if !(0.0..=max_x).contains(&x) || !(0.0..=max_y).contains(&y) {
                return Err(StitchError::OutOfBounds {
                    x: x as f64,
                    y: y as f64,
                    width: level.w,
                    height: level.h,
                });
            }
        }

        let source = &self.sources[kp.level];
        let scale = self.scales[kp.level];
        let mut samples = [0.0f32; DESCRIPTOR_LEN];
        for j in 0..GRID {
            let v = (j as f32 - (GRID as f32 - 1.0) / 2.0) * SPACING;
            for i in 0..GRID {
                let u = (i as f32 - (GRID as f32 - 1.0) / 2.0) * SPACING;
                let (x, y) = rotate(u, v);
                samples[j * GRID + i] =
                    bilinear_clamped(source, (x * scale) as f64, (y * scale) as f64);
            }
        }
        Ok(Descriptor::from_samples(samples))
    }
}

/// Describe every keypoint that fits in its level. Keypoints whose window
/// leaves the image are dropped; the survivors are returned with their
/// descriptors, in input order.
pub fn describe_keypoints(
    pyramid: &Pyramid,
    keypoints: &[Keypoint],
) -> (Vec<Keypoint>, Vec<Descriptor>) {
    let extractor = MopsExtractor::new(pyramid);
    let mut kept = Vec::with_capacity(keypoints.len());
    let mut descriptors = Vec::with_capacity(keypoints.len());
    let mut dropped = 0usize;
    for kp in keypoints {
        match extractor.describe(kp) {
            Ok(d) => {
                kept.push(*kp);
                descriptors.push(d);
            }
            Err(_) => dropped += 1,
        }
    }
    if dropped > 0 {
        log::warn!(
            "describe_keypoints dropped {} of {} keypoints near the border",
            dropped,
            keypoints.len()
        );
    }
    (kept, descriptors)
}
