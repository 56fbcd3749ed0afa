//! Separable smoothing filters and the clamped-border convolution that applies
//! them.
//!
//! The static 5-tap kernel drives pyramid construction; `GaussianFilter`
//! covers the arbitrary-sigma blurs used by the Harris stage, descriptor
//! anti-aliasing and the low band of the two-band blender.
use crate::image::rows::for_each_row;
use crate::image::{ImageF32, ImageView};

/// Trait implemented by separable 1D filters.
pub trait SeparableFilter {
    /// Return the 1D taps (in left-to-right order). The kernel is assumed to be
    /// symmetric around its centre, but the implementation does not rely on it.
    fn taps(&self) -> &[f32];
}

/// Simple wrapper around a static filter kernel.
#[derive(Clone, Copy, Debug)]
pub struct StaticSeparableFilter {
    taps: &'static [f32],
}

impl StaticSeparableFilter {
    pub const fn new(taps: &'static [f32]) -> Self {
        Self { taps }
    }
}

impl SeparableFilter for StaticSeparableFilter {
    #[inline]
    fn taps(&self) -> &[f32] {
        self.taps
    }
}

/// Normalised 5-tap Gaussian filter `[1, 4, 6, 4, 1] / 16`.
pub const GAUSSIAN_5TAP: StaticSeparableFilter =
    StaticSeparableFilter::new(&[0.0625, 0.25, 0.375, 0.25, 0.0625]);

/// Sampled, normalised Gaussian truncated at `3σ`.
#[derive(Clone, Debug)]
pub struct GaussianFilter {
    sigma: f32,
    taps: Vec<f32>,
}

impl GaussianFilter {
    pub fn new(sigma: f32) -> Self {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Self {
                sigma: 0.0,
                taps: vec![1.0],
            };
        }
        let radius = (3.0 * sigma).ceil().max(1.0) as isize;
        let denom = 2.0 * sigma * sigma;
        let mut taps: Vec<f32> = (-radius..=radius)
            .map(|i| (-((i * i) as f32) / denom).exp())
            .collect();
        let sum: f32 = taps.iter().sum();
        for t in &mut taps {
            *t /= sum;
        }
        Self { sigma, taps }
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }
}

impl SeparableFilter for GaussianFilter {
    #[inline]
    fn taps(&self) -> &[f32] {
        &self.taps
    }
}

/// Convolve `img` with `filter` horizontally then vertically, replicating the
/// border.
pub fn convolve_separable<F: SeparableFilter + Sync + ?Sized>(
    img: &ImageF32,
    filter: &F,
) -> ImageF32 {
    let taps = filter.taps();
    if img.is_empty() || taps.len() <= 1 {
        let gain = taps.first().copied().unwrap_or(1.0);
        return img.map(|v| v * gain);
    }
    let radius = (taps.len() / 2) as isize;
    let (w, h) = (img.w, img.h);

    let mut tmp = ImageF32::new(w, h);
    let horizontal = |y: usize, out: &mut [f32]| {
        let row = img.row(y);
        for (x, dst) in out.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for (k, &tap) in taps.iter().enumerate() {
                let sx = (x as isize + k as isize - radius).clamp(0, w as isize - 1) as usize;
                acc += tap * row[sx];
            }
            *dst = acc;
        }
    };
    for_each_row(&mut tmp, horizontal);

    let mut out = ImageF32::new(w, h);
    let vertical = |y: usize, dst_row: &mut [f32]| {
        for (k, &tap) in taps.iter().enumerate() {
            let sy = (y as isize + k as isize - radius).clamp(0, h as isize - 1) as usize;
            let src = tmp.row(sy);
            for (d, &s) in dst_row.iter_mut().zip(src) {
                *d += tap * s;
            }
        }
    };
    for_each_row(&mut out, vertical);
    out
}

/// Blur with a Gaussian of standard deviation `sigma` (identity for σ ≤ 0).
pub fn gaussian_blur(img: &ImageF32, sigma: f32) -> ImageF32 {
    if sigma <= 0.0 {
        return img.clone();
    }
    convolve_separable(img, &GaussianFilter::new(sigma))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_taps_are_normalised_and_symmetric() {
        let g = GaussianFilter::new(1.5);
        let taps = g.taps();
        assert_eq!(taps.len() % 2, 1);
        let sum: f32 = taps.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..taps.len() / 2 {
            assert!((taps[i] - taps[taps.len() - 1 - i]).abs() < 1e-7);
        }
    }

    #[test]
    fn blur_preserves_constant_planes() {
        let img = ImageF32::filled(9, 7, 0.42);
        let out = gaussian_blur(&img, 2.0);
        assert!(out.data.iter().all(|&v| (v - 0.42).abs() < 1e-5));
    }

    #[test]
    fn blur_spreads_an_impulse() {
        let mut img = ImageF32::new(11, 11);
        img.set(5, 5, 1.0);
        let out = convolve_separable(&img, &GAUSSIAN_5TAP);
        assert!((out.get(5, 5) - 0.375 * 0.375).abs() < 1e-6);
        assert!((out.get(4, 5) - 0.25 * 0.375).abs() < 1e-6);
        let total: f32 = out.data.iter().sum();
        assert!((total - 1.0).abs() < 1e-5);
    }
}
