//! Owned single-channel f32 plane in row-major layout (stride == width).
//!
//! Every numeric stage of the stitcher works on these planes: pyramid levels,
//! gradients, coverage masks, distance fields and the channels of [`Image`].
//!
//! [`Image`]: crate::image::Image
use crate::error::{Result, StitchError};

#[derive(Clone, Debug, PartialEq)]
pub struct ImageF32 {
    /// Image width in pixels
    pub w: usize,
    /// Image height in pixels
    pub h: usize,
    /// Number of f32 elements between consecutive rows (equals `w`)
    pub stride: usize,
    /// Backing storage in row-major order
    pub data: Vec<f32>,
}

impl ImageF32 {
    /// Construct a zero-initialized buffer of size `w × h`.
    pub fn new(w: usize, h: usize) -> Self {
        Self::filled(w, h, 0.0)
    }

    /// Construct a buffer of size `w × h` with every pixel set to `value`.
    pub fn filled(w: usize, h: usize, value: f32) -> Self {
        Self {
            w,
            h,
            stride: w,
            data: vec![value; w * h],
        }
    }

    /// Wrap an existing row-major buffer, checking its length.
    pub fn from_vec(w: usize, h: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != w * h {
            return Err(StitchError::InvalidInput(format!(
                "plane buffer holds {} values, expected {}x{}={}",
                data.len(),
                w,
                h,
                w * h
            )));
        }
        Ok(Self {
            w,
            h,
            stride: w,
            data,
        })
    }

    /// Build a plane by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(w: usize, h: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut out = Self::new(w, h);
        for y in 0..h {
            for x in 0..w {
                out.data[y * w + x] = f(x, y);
            }
        }
        out
    }

    #[inline]
    /// Convert (x, y) to a linear index into `data`.
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.stride + x
    }
    #[inline]
    /// Get the pixel value at (x, y).
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.idx(x, y)]
    }
    #[inline]
    /// Set the pixel value at (x, y).
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        let i = self.idx(x, y);
        self.data[i] = v;
    }

    /// Clamped read: coordinates outside the plane replicate the border.
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> f32 {
        let cx = x.clamp(0, self.w as isize - 1) as usize;
        let cy = y.clamp(0, self.h as isize - 1) as usize;
        self.get(cx, cy)
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Apply `f` to every pixel, producing a new plane.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            w: self.w,
            h: self.h,
            stride: self.stride,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Mean pixel value (0 for an empty plane).
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().copied().sum::<f32>() / self.data.len() as f32
    }
}

impl crate::image::traits::ImageView for ImageF32 {
    type Pixel = f32;

    #[inline]
    fn width(&self) -> usize {
        self.w
    }
    #[inline]
    fn height(&self) -> usize {
        self.h
    }
    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }
    #[inline]
    fn row(&self, y: usize) -> &[f32] {
        let start = y * self.stride;
        &self.data[start..start + self.w]
    }
    #[inline]
    fn as_slice(&self) -> Option<&[f32]> {
        (self.stride == self.w).then_some(&self.data[..self.w * self.h])
    }
}

impl crate::image::traits::ImageViewMut for ImageF32 {
    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = y * self.stride;
        let end = start + self.w;
        &mut self.data[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_wrong_length() {
        assert!(ImageF32::from_vec(3, 2, vec![0.0; 5]).is_err());
        let img = ImageF32::from_vec(3, 2, vec![1.0; 6]).unwrap();
        assert_eq!(img.get(2, 1), 1.0);
    }

    #[test]
    fn clamped_reads_replicate_border() {
        let img = ImageF32::from_fn(4, 3, |x, y| (x + 10 * y) as f32);
        assert_eq!(img.get_clamped(-3, 0), 0.0);
        assert_eq!(img.get_clamped(9, 2), 23.0);
        assert_eq!(img.get_clamped(1, -1), 1.0);
    }
}
