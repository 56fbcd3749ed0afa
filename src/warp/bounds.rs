use crate::error::{Result, StitchError};
use crate::geometry::Homography;

use nalgebra::Vector3;
use serde::Serialize;

/// Integer rectangle on the composition surface. Canvas pixel `(u, v)` is
/// surface coordinate `(x0 + u, y0 + v)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasBounds {
    pub x0: i64,
    pub y0: i64,
    pub width: usize,
    pub height: usize,
}

impl CanvasBounds {
    pub fn new(x0: i64, y0: i64, width: usize, height: usize) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
        }
    }

    /// Bounds of an unwarped `width × height` image at the origin.
    pub fn of_image(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Bounding box of a `width × height` image's corners mapped through `h`.
    ///
    /// Fails if a corner maps to infinity, if the corners fall on both sides
    /// of the horizon line, or if the box would exceed `max_pixels`.
    pub fn from_homography(
        h: &Homography,
        width: usize,
        height: usize,
        max_pixels: usize,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(StitchError::InvalidInput("cannot warp an empty image".into()));
        }
        let (xm, ym) = ((width - 1) as f64, (height - 1) as f64);
        let corners = [[0.0, 0.0], [xm, 0.0], [xm, ym], [0.0, ym]];

        let m = h.matrix();
        let signs: Vec<f64> = corners
            .iter()
            .map(|c| (m * Vector3::new(c[0], c[1], 1.0))[2].signum())
            .collect();
        if signs.iter().any(|&s| s != signs[0]) {
            return Err(StitchError::degenerate(
                "warped image straddles the horizon line",
            ));
        }

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for c in corners {
            let p = h
                .apply(c)
                .ok_or_else(|| StitchError::degenerate("image corner projects to infinity"))?;
            min_x = min_x.min(p[0]);
            min_y = min_y.min(p[1]);
            max_x = max_x.max(p[0]);
            max_y = max_y.max(p[1]);
        }
        let limit = i64::MAX as f64 / 4.0;
        if [min_x, min_y, max_x, max_y].iter().any(|v| v.abs() > limit) {
            return Err(StitchError::degenerate("warped extent is unbounded"));
        }
        let x0 = snap(min_x).floor() as i64;
        let y0 = snap(min_y).floor() as i64;
        let w = (snap(max_x).ceil() as i64 - x0 + 1) as u128;
        let hgt = (snap(max_y).ceil() as i64 - y0 + 1) as u128;
        if w * hgt > max_pixels as u128 {
            return Err(StitchError::degenerate(format!(
                "warped canvas {w}x{hgt} exceeds the {max_pixels} pixel limit"
            )));
        }
        Ok(Self::new(x0, y0, w as usize, hgt as usize))
    }

    #[inline]
    pub fn x1(&self) -> i64 {
        self.x0 + self.width as i64
    }

    #[inline]
    pub fn y1(&self) -> i64 {
        self.y0 + self.height as i64
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &CanvasBounds) -> CanvasBounds {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x0 = self.x0.min(other.x0);
        let y0 = self.y0.min(other.y0);
        let x1 = self.x1().max(other.x1());
        let y1 = self.y1().max(other.y1());
        Self::new(x0, y0, (x1 - x0) as usize, (y1 - y0) as usize)
    }

    /// Overlap of both rectangles (possibly empty).
    pub fn intersection(&self, other: &CanvasBounds) -> CanvasBounds {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1().min(other.x1());
        let y1 = self.y1().min(other.y1());
        if x1 <= x0 || y1 <= y0 {
            return Self::new(x0, y0, 0, 0);
        }
        Self::new(x0, y0, (x1 - x0) as usize, (y1 - y0) as usize)
    }

    pub fn contains(&self, other: &CanvasBounds) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1() <= self.x1() && other.y1() <= self.y1()
    }

    /// Pixel offset of `inner`'s origin inside `self`.
    pub fn offset_of(&self, inner: &CanvasBounds) -> Option<(usize, usize)> {
        self.contains(inner)
            .then(|| ((inner.x0 - self.x0) as usize, (inner.y0 - self.y0) as usize))
    }

    pub fn check_size(&self, max_pixels: usize) -> Result<()> {
        if (self.width as u128) * (self.height as u128) > max_pixels as u128 {
            return Err(StitchError::degenerate(format!(
                "canvas {}x{} exceeds the {} pixel limit",
                self.width, self.height, max_pixels
            )));
        }
        Ok(())
    }
}

/// Round-off-level distances to an integer are treated as exact.
#[inline]
fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < 1e-6 {
        r
    } else {
        v
    }
}
