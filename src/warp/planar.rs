//! Inverse-mapped planar warping.
//!
//! Every destination pixel inside the source's footprint is pulled back
//! through `H⁻¹` and sampled bilinearly. Preimages outside the source (or on
//! uncovered source pixels) stay uncovered. Rows run in parallel.
use super::{CanvasBounds, Layer};
use crate::error::Result;
use crate::geometry::Homography;
use crate::image::rows::for_each_chunk;
use crate::image::{bilinear, Image, ImageF32};

/// Source mask value required for a sample to count as covered; below 1 only
/// by round-off when every contributing source pixel is covered.
const MASK_COVERED: f32 = 1.0 - 1e-3;

/// Warp `source` (pixel coordinates local to its own grid) through `h` onto
/// `target`. Only the part of `target` inside the warped footprint is
/// visited.
pub fn warp_layer_into(source: &Layer, h: &Homography, target: CanvasBounds) -> Result<Layer> {
    let (sw, sh) = (source.bounds.width, source.bounds.height);
    let channels = source.channels();
    let mut out = Layer::empty(target, channels);
    if sw == 0 || sh == 0 || target.is_empty() {
        return Ok(out);
    }
    let footprint = CanvasBounds::from_homography(h, sw, sh, usize::MAX)?;
    let region = footprint.intersection(&target);
    if region.is_empty() {
        return Ok(out);
    }
    let inv = h.inverse()?;
    log::debug!(
        "warp_layer_into src={}x{} target={}x{} region={}x{}",
        sw,
        sh,
        target.width,
        target.height,
        region.width,
        region.height
    );

    // interleaved [mask, c0, c1, ...] per pixel of the region
    let stride = channels + 1;
    let row_len = region.width * stride;
    let mut buf = vec![0.0f32; row_len * region.height];
    let planes = source.image.planes();
    for_each_chunk(&mut buf, row_len, |rv, row| {
        let sy = (region.y0 + rv as i64) as f64;
        for ru in 0..region.width {
            let sx = (region.x0 + ru as i64) as f64;
            let Some([px, py]) = inv.apply([sx, sy]) else {
                continue;
            };
            if !bilinear(&source.mask, px, py).is_some_and(|m| m >= MASK_COVERED) {
                continue;
            }
            let px_out = &mut row[ru * stride..(ru + 1) * stride];
            px_out[0] = 1.0;
            for (c, plane) in planes.iter().enumerate() {
                px_out[c + 1] = bilinear(plane, px, py).unwrap_or(0.0);
            }
        }
    });

    let (ox, oy) = ((region.x0 - target.x0) as usize, (region.y0 - target.y0) as usize);
    for rv in 0..region.height {
        for ru in 0..region.width {
            let src = (rv * region.width + ru) * stride;
            if buf[src] == 0.0 {
                continue;
            }
            let (u, v) = (ox + ru, oy + rv);
            out.mask.set(u, v, 1.0);
            for (c, plane) in out.image.planes_mut().iter_mut().enumerate() {
                plane.set(u, v, buf[src + c + 1]);
            }
        }
    }
    Ok(out)
}

/// Warp a fully covered image onto `target`.
pub fn warp_into(image: &Image, h: &Homography, target: CanvasBounds) -> Result<Layer> {
    warp_layer_into(&Layer::from_image(image.clone()), h, target)
}

/// Warp an image onto its own bounding box on the surface.
pub fn warp_planar(image: &Image, h: &Homography, max_pixels: usize) -> Result<Layer> {
    let bounds = CanvasBounds::from_homography(h, image.width(), image.height(), max_pixels)?;
    warp_into(image, h, bounds)
}
