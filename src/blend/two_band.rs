//! Two-band blending.
//!
//! Each channel is split into a low band (mask-normalised Gaussian blur, so
//! uncovered pixels do not darken the edge) and a high band (the residual).
//! In the overlap the low bands are averaged with distance-field weights and
//! the high band is taken whole from the layer whose pixel lies deeper inside
//! its own coverage. Outside the overlap each layer passes through unchanged.
use super::canvas::{Canvas, Composite};
use super::distance::DistanceField;
use crate::error::{Result, StitchError};
use crate::image::rows::for_each_row;
use crate::image::ImageF32;
use crate::pyramid::gaussian_blur;
use crate::warp::Layer;

/// Default low-band Gaussian standard deviation in pixels.
pub const DEFAULT_SIGMA: f32 = 2.0;

const NORM_EPS: f32 = 1e-6;

/// Low-band weights `(w_base, w_incoming)` for a pixel covered by both
/// layers. Each layer is weighted by its own distance to its coverage edge.
#[inline]
pub fn low_band_weights(d_base: f32, d_incoming: f32) -> (f32, f32) {
    let sum = d_base + d_incoming;
    if sum <= 0.0 {
        return (0.5, 0.5);
    }
    (d_base / sum, d_incoming / sum)
}

/// Split `plane` into `(low, high)` bands restricted to `mask`.
pub fn split_bands(plane: &ImageF32, mask: &ImageF32, sigma: f32) -> (ImageF32, ImageF32) {
    let mut weighted = plane.clone();
    for (v, &m) in weighted.data.iter_mut().zip(&mask.data) {
        *v *= m;
    }
    let num = gaussian_blur(&weighted, sigma);
    let den = gaussian_blur(mask, sigma);

    let mut low = ImageF32::new(plane.w, plane.h);
    let w = plane.w;
    for_each_row(&mut low, |y, row| {
        for (x, dst) in row.iter_mut().enumerate() {
            let i = y * w + x;
            if mask.data[i] <= 0.5 {
                continue;
            }
            *dst = if den.data[i] > NORM_EPS {
                num.data[i] / den.data[i]
            } else {
                plane.data[i]
            };
        }
    });
    let mut high = plane.clone();
    for ((h, &l), &m) in high.data.iter_mut().zip(&low.data).zip(&mask.data) {
        *h = if m > 0.5 { *h - l } else { 0.0 };
    }
    (low, high)
}

/// Blend `incoming` over `base`; both must share bounds and channel count.
pub fn two_band_blend(
    base: &Layer,
    incoming: &Layer,
    d_base: &DistanceField,
    d_incoming: &DistanceField,
    sigma: f32,
) -> Result<Composite> {
    if base.bounds != incoming.bounds || base.channels() != incoming.channels() {
        return Err(StitchError::InvalidInput(format!(
            "cannot blend {:?}x{} with {:?}x{}",
            base.bounds,
            base.channels(),
            incoming.bounds,
            incoming.channels()
        )));
    }
    log::debug!(
        "two_band_blend w={} h={} sigma={:.2}",
        base.bounds.width,
        base.bounds.height,
        sigma
    );
    let w = base.bounds.width;
    let mut canvas = Canvas::new(base.bounds, base.channels());
    let mut covered = base.mask.clone();
    for (dst, &m) in covered.data.iter_mut().zip(&incoming.mask.data) {
        *dst = if *dst > 0.5 || m > 0.5 { 1.0 } else { 0.0 };
    }

    for c in 0..base.channels() {
        let (p1, p2) = (base.image.plane(c), incoming.image.plane(c));
        let (low1, high1) = split_bands(p1, &base.mask, sigma);
        let (low2, high2) = split_bands(p2, &incoming.mask, sigma);

        let mut out = ImageF32::new(w, base.bounds.height);
        for_each_row(&mut out, |y, row| {
            for (x, dst) in row.iter_mut().enumerate() {
                let i = y * w + x;
                let in1 = base.mask.data[i] > 0.5;
                let in2 = incoming.mask.data[i] > 0.5;
                *dst = match (in1, in2) {
                    (true, true) => {
                        let (da, db) = (d_base.data[i], d_incoming.data[i]);
                        let (wa, wb) = low_band_weights(da, db);
                        let low = wa * low1.data[i] + wb * low2.data[i];
                        let high = if db > da { high2.data[i] } else { high1.data[i] };
                        low + high
                    }
                    (true, false) => p1.data[i],
                    (false, true) => p2.data[i],
                    (false, false) => 0.0,
                };
            }
        });
        canvas.put_plane(c, out, &covered);
    }
    Ok(canvas.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::distance_transform;
    use crate::image::Image;
    use crate::warp::CanvasBounds;

    fn half_layer(value: f32, from: usize, to: usize) -> Layer {
        let bounds = CanvasBounds::of_image(30, 10);
        let mut layer = Layer::empty(bounds, 1);
        let plane = ImageF32::from_fn(30, 10, |x, _| if (from..to).contains(&x) { value } else { 0.0 });
        layer.mask = ImageF32::from_fn(30, 10, |x, _| if (from..to).contains(&x) { 1.0 } else { 0.0 });
        layer.image = Image::from_plane(plane);
        layer
    }

    #[test]
    fn weights_follow_own_distance() {
        assert_eq!(low_band_weights(3.0, 1.0), (0.75, 0.25));
        assert_eq!(low_band_weights(0.0, 0.0), (0.5, 0.5));
    }

    #[test]
    fn overlap_transitions_smoothly_and_singles_pass_through() {
        let a = half_layer(0.2, 0, 20);
        let b = half_layer(0.8, 10, 30);
        let (da, db) = (distance_transform(&a.mask), distance_transform(&b.mask));
        let out = two_band_blend(&a, &b, &da, &db, DEFAULT_SIGMA).unwrap();
        assert_eq!(out.image.get(3, 5, 0), 0.2);
        assert_eq!(out.image.get(26, 5, 0), 0.8);
        assert_eq!(out.covered_pixels(), 300);
        let mut prev = 0.0;
        for x in 10..20 {
            let v = out.image.get(x, 5, 0);
            assert!((0.2 - 1e-5..=0.8 + 1e-5).contains(&v));
            assert!(v >= prev - 1e-5, "not monotone at x={x}");
            prev = v;
        }
    }

    fn rect_layer(value: f32, xs: std::ops::Range<usize>, ys: std::ops::Range<usize>) -> Layer {
        let bounds = CanvasBounds::of_image(40, 32);
        let inside = |x: usize, y: usize| xs.contains(&x) && ys.contains(&y);
        let mut layer = Layer::empty(bounds, 1);
        layer.mask = ImageF32::from_fn(40, 32, |x, y| if inside(x, y) { 1.0 } else { 0.0 });
        layer.image = Image::from_plane(ImageF32::from_fn(40, 32, |x, y| {
            if inside(x, y) {
                value
            } else {
                0.0
            }
        }));
        layer
    }

    #[test]
    fn low_band_weights_partition_unity_across_the_overlap() {
        let a = rect_layer(0.5, 0..26, 0..22);
        let b = rect_layer(0.5, 12..40, 9..32);
        let (da, db) = (distance_transform(&a.mask), distance_transform(&b.mask));
        let out = two_band_blend(&a, &b, &da, &db, DEFAULT_SIGMA).unwrap();

        let mut overlap = 0;
        for y in 0..32 {
            for x in 0..40 {
                let i = y * 40 + x;
                let (in_a, in_b) = (a.mask.data[i] > 0.5, b.mask.data[i] > 0.5);
                if in_a && in_b {
                    overlap += 1;
                    let (wa, wb) = low_band_weights(da.data[i], db.data[i]);
                    assert!((wa + wb - 1.0).abs() < 1e-6, "weights sum to {} at ({x}, {y})", wa + wb);
                    assert!((0.0..=1.0).contains(&wa) && (0.0..=1.0).contains(&wb));
                }
                if in_a || in_b {
                    // equal constant layers stay constant only if the weights sum to one
                    let v = out.image.get(x, y, 0);
                    assert!((v - 0.5).abs() < 1e-5, "({x}, {y}) = {v}");
                }
            }
        }
        assert_eq!(overlap, 14 * 13);
    }

    #[test]
    fn identical_layers_reproduce_input() {
        let plane = ImageF32::from_fn(16, 12, |x, y| ((x * 7 + y * 3) % 11) as f32 / 11.0);
        let layer = Layer::from_image(Image::from_plane(plane.clone()));
        let d = distance_transform(&layer.mask);
        let out = two_band_blend(&layer, &layer, &d, &d, 1.5).unwrap();
        for (a, b) in out.image.plane(0).data.iter().zip(&plane.data) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn mismatched_bounds_are_rejected() {
        let a = Layer::empty(CanvasBounds::of_image(4, 4), 1);
        let b = Layer::empty(CanvasBounds::of_image(5, 4), 1);
        let d = ImageF32::new(4, 4);
        assert!(two_band_blend(&a, &b, &d, &d, 2.0).is_err());
    }
}
