//! Multi-scale Harris corner detection.
//!
//! Per pyramid level: pre-smooth with `σ_d`, differentiate, accumulate the
//! structure tensor `Σ ∇I∇Iᵀ` with an integration Gaussian `σ_i`, and score
//! each pixel with the harmonic-mean response `det / trace`. Candidates must
//! clear the threshold and be strict maxima of their 3×3 neighbourhood; the
//! outermost pixel frame is skipped.
//!
//! Orientation comes from the gradient of the level blurred with `σ_o`.
use super::options::HarrisOptions;
use crate::edges::image_gradients;
use crate::error::{Result, StitchError};
use crate::image::{ImageF32, ImageView};
use crate::pyramid::{gaussian_blur, Pyramid};
use crate::types::Keypoint;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Trace below which the response is defined as zero.
const TRACE_EPS: f32 = 1e-12;

/// Harris response map `det(M) / trace(M)` of one plane.
pub fn harris_response(level: &ImageF32, opts: &HarrisOptions) -> ImageF32 {
    let smoothed = gaussian_blur(level, opts.sigma_d);
    let grad = image_gradients(&smoothed, opts.kernel);

    let n = level.w * level.h;
    let mut ixx = Vec::with_capacity(n);
    let mut iyy = Vec::with_capacity(n);
    let mut ixy = Vec::with_capacity(n);
    for (&gx, &gy) in grad.gx.data.iter().zip(&grad.gy.data) {
        ixx.push(gx * gx);
        iyy.push(gy * gy);
        ixy.push(gx * gy);
    }
    let to_plane = |data: Vec<f32>| ImageF32 {
        w: level.w,
        h: level.h,
        stride: level.w,
        data,
    };
    let sxx = gaussian_blur(&to_plane(ixx), opts.sigma_i);
    let syy = gaussian_blur(&to_plane(iyy), opts.sigma_i);
    let sxy = gaussian_blur(&to_plane(ixy), opts.sigma_i);

    let mut response = ImageF32::new(level.w, level.h);
    for (i, r) in response.data.iter_mut().enumerate() {
        let (a, b, c) = (sxx.data[i], syy.data[i], sxy.data[i]);
        let trace = a + b;
        *r = if trace > TRACE_EPS {
            (a * b - c * c) / trace
        } else {
            0.0
        };
    }
    response
}

/// Strict 3×3 local maxima of `response` above `threshold`, in row-major order.
pub fn local_maxima(response: &ImageF32, threshold: f32) -> Vec<(usize, usize, f32)> {
    let (w, h) = (response.w, response.h);
    let mut out = Vec::new();
    if w < 3 || h < 3 {
        return out;
    }
    for y in 1..h - 1 {
        let rows = [response.row(y - 1), response.row(y), response.row(y + 1)];
        for x in 1..w - 1 {
            let r = rows[1][x];
            if r <= threshold {
                continue;
            }
            let is_max = rows.iter().enumerate().all(|(dy, row)| {
                (x - 1..=x + 1).all(|xx| (dy == 1 && xx == x) || row[xx] < r)
            });
            if is_max {
                out.push((x, y, r));
            }
        }
    }
    out
}

/// Detect corners on a single level.
pub fn detect_level(level: &ImageF32, index: usize, opts: &HarrisOptions) -> Vec<Keypoint> {
    let response = harris_response(level, opts);
    let maxima = local_maxima(&response, opts.threshold);
    if maxima.is_empty() {
        return Vec::new();
    }
    let orient = image_gradients(&gaussian_blur(level, opts.sigma_o), opts.kernel);
    maxima
        .into_iter()
        .map(|(x, y, r)| {
            let (gx, gy) = orient.at(x, y);
            let orientation = if gx.hypot(gy) > 1e-12 {
                gy.atan2(gx)
            } else {
                0.0
            };
            Keypoint {
                x: x as f32,
                y: y as f32,
                level: index,
                response: r,
                orientation,
            }
        })
        .collect()
}

/// Run the detector on every pyramid level. Keypoints are grouped by level,
/// row-major within a level.
pub fn detect_corners(pyramid: &Pyramid, opts: &HarrisOptions) -> Result<Vec<Keypoint>> {
    log::debug!(
        "detect_corners start levels={} threshold={:e}",
        pyramid.levels.len(),
        opts.threshold
    );

    #[cfg(feature = "parallel")]
    let per_level: Vec<Vec<Keypoint>> = pyramid
        .levels
        .par_iter()
        .enumerate()
        .map(|(i, level)| detect_level(level, i, opts))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let per_level: Vec<Vec<Keypoint>> = pyramid
        .levels
        .iter()
        .enumerate()
        .map(|(i, level)| detect_level(level, i, opts))
        .collect();

    for (i, kps) in per_level.iter().enumerate() {
        log::debug!("detect_corners level={} candidates={}", i, kps.len());
    }
    let keypoints: Vec<Keypoint> = per_level.into_iter().flatten().collect();
    if keypoints.is_empty() {
        return Err(StitchError::NoFeaturesFound {
            threshold: opts.threshold,
            levels: pyramid.levels.len(),
        });
    }
    Ok(keypoints)
}
