//! Cylindrical reprojection for panoramas taken by rotating the camera about
//! its vertical axis.
//!
//! With pixel coordinates `(x, y)` relative to the image centre and focal
//! length `f` in pixels, the forward map is
//! `θ = f·atan(x/f)`, `h = f·y/√(x² + f²)`. The inverse reconstructs the ray
//! `(sin(θ/f), h/f, cos(θ/f))` and projects it back onto the image plane.
//! After reprojection, neighbouring frames differ by a translation.
use super::{CanvasBounds, Layer};
use crate::error::{Result, StitchError};
use crate::image::rows::for_each_chunk;
use crate::image::{bilinear, Image};

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CylindricalProjection {
    /// Focal length in pixels.
    pub focal: f64,
    /// Optical centre in pixel coordinates.
    pub center: [f64; 2],
}

impl CylindricalProjection {
    pub fn new(focal: f64, center: [f64; 2]) -> Result<Self> {
        if !(focal.is_finite() && focal > 0.0) {
            return Err(StitchError::InvalidInput(format!(
                "focal length must be positive, got {focal}"
            )));
        }
        Ok(Self { focal, center })
    }

    /// Projection centred on a `width × height` image.
    pub fn for_image(focal: f64, width: usize, height: usize) -> Result<Self> {
        let center = [
            (width.max(1) - 1) as f64 / 2.0,
            (height.max(1) - 1) as f64 / 2.0,
        ];
        Self::new(focal, center)
    }

    /// Image-plane point to cylinder coordinates.
    pub fn forward(&self, p: [f64; 2]) -> [f64; 2] {
        let f = self.focal;
        let x = p[0] - self.center[0];
        let y = p[1] - self.center[1];
        let theta = f * (x / f).atan();
        let h = f * y / x.hypot(f);
        [theta + self.center[0], h + self.center[1]]
    }

    /// Cylinder coordinates back to the image plane; `None` for points at or
    /// beyond ±90° from the optical axis.
    pub fn inverse(&self, q: [f64; 2]) -> Option<[f64; 2]> {
        let f = self.focal;
        let theta = q[0] - self.center[0];
        let h = q[1] - self.center[1];
        let (x_hat, z_hat) = (theta / f).sin_cos();
        let y_hat = h / f;
        if z_hat <= 1e-12 {
            return None;
        }
        Some([
            f * x_hat / z_hat + self.center[0],
            f * y_hat / z_hat + self.center[1],
        ])
    }
}

/// Resample `image` onto the cylinder, keeping its size. Pixels whose ray
/// leaves the source frame are uncovered.
pub fn warp_cylindrical(image: &Image, projection: &CylindricalProjection) -> Layer {
    let (w, h) = (image.width(), image.height());
    let channels = image.channels();
    let mut out = Layer::empty(CanvasBounds::of_image(w, h), channels);
    if w == 0 || h == 0 {
        return out;
    }
    log::debug!(
        "warp_cylindrical w={} h={} focal={:.1}",
        w,
        h,
        projection.focal
    );

    let stride = channels + 1;
    let mut buf = vec![0.0f32; w * h * stride];
    let planes = image.planes();
    for_each_chunk(&mut buf, w * stride, |v, row| {
        for u in 0..w {
            let Some([px, py]) = projection.inverse([u as f64, v as f64]) else {
                continue;
            };
            let values: Option<Vec<f32>> = planes.iter().map(|p| bilinear(p, px, py)).collect();
            if let Some(values) = values {
                let px_out = &mut row[u * stride..(u + 1) * stride];
                px_out[0] = 1.0;
                px_out[1..].copy_from_slice(&values);
            }
        }
    });

    for (i, px) in buf.chunks_exact(stride).enumerate() {
        if px[0] == 0.0 {
            continue;
        }
        out.mask.data[i] = 1.0;
        for (c, plane) in out.image.planes_mut().iter_mut().enumerate() {
            plane.data[i] = px[c + 1];
        }
    }
    out
}

/// Focal length in pixels from the lens focal length and sensor width.
pub fn focal_length_px(focal_mm: f64, sensor_width_mm: f64, width_px: usize) -> Result<f64> {
    if !(focal_mm > 0.0 && sensor_width_mm > 0.0) || width_px == 0 {
        return Err(StitchError::InvalidInput(format!(
            "focal length {focal_mm}mm, sensor width {sensor_width_mm}mm and image width {width_px}px must be positive"
        )));
    }
    Ok(focal_mm / sensor_width_mm * width_px as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageF32;

    #[test]
    fn forward_then_inverse_is_identity() {
        let proj = CylindricalProjection::new(500.0, [320.0, 240.0]).unwrap();
        for p in [[0.0, 0.0], [320.0, 240.0], [639.0, 10.0], [100.5, 470.25]] {
            let back = proj.inverse(proj.forward(p)).unwrap();
            assert!((back[0] - p[0]).abs() < 1e-9 && (back[1] - p[1]).abs() < 1e-9);
        }
    }

    #[test]
    fn centre_is_fixed_and_edges_contract() {
        let proj = CylindricalProjection::new(500.0, [320.0, 240.0]).unwrap();
        assert_eq!(proj.forward([320.0, 240.0]), [320.0, 240.0]);
        let edge = proj.forward([639.0, 240.0]);
        assert!(edge[0] < 639.0 && edge[0] > 600.0);
        assert!(proj.inverse([320.0 + 500.0 * std::f64::consts::FRAC_PI_2, 0.0]).is_none());
    }

    #[test]
    fn cylindrical_warp_keeps_centre_and_uncovers_corners() {
        let img = Image::from_plane(ImageF32::from_fn(41, 31, |x, y| (x + y) as f32 * 0.01));
        let proj = CylindricalProjection::for_image(30.0, 41, 31).unwrap();
        let layer = warp_cylindrical(&img, &proj);
        assert!(layer.covered(20, 15));
        assert!((layer.image.get(20, 15, 0) - img.get(20, 15, 0)).abs() < 1e-6);
        assert!(!layer.covered(0, 0));
    }

    #[test]
    fn focal_from_physical_parameters() {
        let f = focal_length_px(35.0, 36.0, 1800).unwrap();
        assert!((f - 1750.0).abs() < 1e-9);
        assert!(focal_length_px(0.0, 36.0, 100).is_err());
    }
}
