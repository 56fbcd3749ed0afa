//! Bilinear sampling on single-channel planes.
//!
//! `bilinear` follows the warp contract: coordinates outside
//! `[0, w-1] × [0, h-1]` have no value. At integer coordinates the four-tap
//! blend degenerates to the exact source pixel.
use super::ImageF32;

/// Tolerance for preimages that land a hair outside the source extent
/// through floating-point round-off.
const EDGE_EPS: f64 = 1e-6;

/// Sample `img` at (x, y), or `None` if the point lies outside the plane.
#[inline]
pub fn bilinear(img: &ImageF32, x: f64, y: f64) -> Option<f32> {
    if !x.is_finite() || !y.is_finite() || img.is_empty() {
        return None;
    }
    let max_x = (img.w - 1) as f64;
    let max_y = (img.h - 1) as f64;
    if x < -EDGE_EPS || y < -EDGE_EPS || x > max_x + EDGE_EPS || y > max_y + EDGE_EPS {
        return None;
    }
    Some(sample_inside(img, x.clamp(0.0, max_x), y.clamp(0.0, max_y)))
}

/// Sample `img` at (x, y), replicating the border outside the plane.
#[inline]
pub fn bilinear_clamped(img: &ImageF32, x: f64, y: f64) -> f32 {
    if img.is_empty() {
        return 0.0;
    }
    let max_x = (img.w - 1) as f64;
    let max_y = (img.h - 1) as f64;
    let x = if x.is_finite() { x.clamp(0.0, max_x) } else { 0.0 };
    let y = if y.is_finite() { y.clamp(0.0, max_y) } else { 0.0 };
    sample_inside(img, x, y)
}

#[inline]
fn sample_inside(img: &ImageF32, x: f64, y: f64) -> f32 {
    let xf = x.floor();
    let yf = y.floor();
    let x0 = xf as usize;
    let y0 = yf as usize;
    let x1 = (x0 + 1).min(img.w - 1);
    let y1 = (y0 + 1).min(img.h - 1);
    let tx = (x - xf) as f32;
    let ty = (y - yf) as f32;
    if tx == 0.0 && ty == 0.0 {
        return img.get(x0, y0);
    }

    let v00 = img.get(x0, y0);
    let v10 = img.get(x1, y0);
    let v01 = img.get(x0, y1);
    let v11 = img.get(x1, y1);
    let top = v00 * (1.0 - tx) + v10 * tx;
    let bottom = v01 * (1.0 - tx) + v11 * tx;
    top * (1.0 - ty) + bottom * ty
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ImageF32 {
        ImageF32::from_fn(5, 4, |x, y| (x * x) as f32 + 7.0 * y as f32)
    }

    #[test]
    fn integer_coordinates_return_exact_pixels() {
        let img = ramp();
        for y in 0..img.h {
            for x in 0..img.w {
                assert_eq!(bilinear(&img, x as f64, y as f64), Some(img.get(x, y)));
            }
        }
    }

    #[test]
    fn midpoints_average_neighbours() {
        let img = ramp();
        let v = bilinear(&img, 1.5, 0.0).unwrap();
        assert!((v - 2.5).abs() < 1e-6);
        let v = bilinear(&img, 0.0, 0.5).unwrap();
        assert!((v - 3.5).abs() < 1e-6);
    }

    #[test]
    fn outside_points_have_no_value() {
        let img = ramp();
        assert!(bilinear(&img, -0.5, 1.0).is_none());
        assert!(bilinear(&img, 4.2, 1.0).is_none());
        assert!(bilinear(&img, f64::NAN, 1.0).is_none());
        assert_eq!(bilinear_clamped(&img, -3.0, 0.0), img.get(0, 0));
    }
}
