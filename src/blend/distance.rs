//! Exact Euclidean distance transform of a coverage mask.
//!
//! Separable lower-envelope algorithm (Felzenszwalb & Huttenlocher): a 1D
//! squared-distance pass down every column, then along every row. The mask
//! is padded with one ring of unfilled pixels so that the canvas edge counts
//! as unfilled; a covered pixel on the edge therefore has distance 1.
use crate::image::rows::for_each_chunk;
use crate::image::ImageF32;

/// Per-pixel distance to the nearest unfilled or off-canvas pixel.
pub type DistanceField = ImageF32;

/// Distance field of `mask` (pixels with value > 0.5 are filled).
pub fn distance_transform(mask: &ImageF32) -> DistanceField {
    let (w, h) = (mask.w, mask.h);
    if mask.is_empty() {
        return ImageF32::new(w, h);
    }
    let (pw, ph) = (w + 2, h + 2);
    let filled = |px: usize, py: usize| -> bool {
        px >= 1 && py >= 1 && px <= w && py <= h && mask.get(px - 1, py - 1) > 0.5
    };

    // column pass, stored transposed: cols[x * ph + y]
    let mut cols = vec![0.0f64; pw * ph];
    for_each_chunk(&mut cols, ph, |x, col| {
        let f: Vec<f64> = (0..ph)
            .map(|y| if filled(x, y) { f64::INFINITY } else { 0.0 })
            .collect();
        lower_envelope(&f, col);
    });

    let mut rows = vec![0.0f64; pw * ph];
    for_each_chunk(&mut rows, pw, |y, row| {
        let f: Vec<f64> = (0..pw).map(|x| cols[x * ph + y]).collect();
        lower_envelope(&f, row);
    });

    let mut out = ImageF32::new(w, h);
    for y in 0..h {
        for x in 0..w {
            out.set(x, y, rows[(y + 1) * pw + x + 1].sqrt() as f32);
        }
    }
    out
}

/// 1D squared distance transform: `d[q] = min_p (q − p)² + f[p]`.
/// Infinite samples contribute no parabola.
fn lower_envelope(f: &[f64], d: &mut [f64]) {
    let n = f.len();
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k: isize = -1;
    for q in 0..n {
        if !f[q].is_finite() {
            continue;
        }
        let fq = f[q] + (q * q) as f64;
        loop {
            if k < 0 {
                k = 0;
                v[0] = q;
                z[0] = f64::NEG_INFINITY;
                z[1] = f64::INFINITY;
                break;
            }
            let p = v[k as usize];
            let s = (fq - (f[p] + (p * p) as f64)) / (2.0 * (q - p) as f64);
            if s <= z[k as usize] {
                k -= 1;
                continue;
            }
            k += 1;
            v[k as usize] = q;
            z[k as usize] = s;
            z[k as usize + 1] = f64::INFINITY;
            break;
        }
    }
    if k < 0 {
        d.fill(f64::INFINITY);
        return;
    }
    let mut j = 0usize;
    for (q, out) in d.iter_mut().enumerate() {
        while z[j + 1] < q as f64 {
            j += 1;
        }
        let p = v[j];
        let dq = q as f64 - p as f64;
        *out = dq * dq + f[p];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute(mask: &ImageF32) -> ImageF32 {
        let (w, h) = (mask.w as isize, mask.h as isize);
        ImageF32::from_fn(mask.w, mask.h, |x, y| {
            if mask.get(x, y) <= 0.5 {
                return 0.0;
            }
            let mut best = f64::INFINITY;
            for py in -1..=h {
                for px in -1..=w {
                    let unfilled = px < 0
                        || py < 0
                        || px >= w
                        || py >= h
                        || mask.get(px as usize, py as usize) <= 0.5;
                    if unfilled {
                        let dx = (px - x as isize) as f64;
                        let dy = (py - y as isize) as f64;
                        best = best.min(dx.hypot(dy));
                    }
                }
            }
            best as f32
        })
    }

    #[test]
    fn full_mask_measures_distance_to_edge() {
        let d = distance_transform(&ImageF32::filled(7, 5, 1.0));
        assert_eq!(d.get(0, 0), 1.0);
        assert_eq!(d.get(3, 2), 3.0);
        assert_eq!(d.get(6, 2), 1.0);
        assert_eq!(d.get(2, 1), 2.0);
    }

    #[test]
    fn matches_brute_force_on_irregular_mask() {
        let mask = ImageF32::from_fn(13, 11, |x, y| {
            let inside = (x as i32 - 6).pow(2) + (y as i32 - 5).pow(2) < 22;
            if inside && !(x == 7 && y == 4) { 1.0 } else { 0.0 }
        });
        let fast = distance_transform(&mask);
        let slow = brute(&mask);
        for (a, b) in fast.data.iter().zip(&slow.data) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }

    #[test]
    fn unfilled_pixels_are_zero() {
        let mut mask = ImageF32::filled(5, 5, 1.0);
        mask.set(2, 2, 0.0);
        let d = distance_transform(&mask);
        assert_eq!(d.get(2, 2), 0.0);
        assert_eq!(d.get(2, 1), 1.0);
    }
}
