//! Planar multi-channel image used as pipeline input and output.
//!
//! Each channel is stored as its own [`ImageF32`] so the single-channel
//! kernels (blur, warp, blend) run unchanged per plane. Values are nominally
//! in `[0, 1]`; 8-bit inputs are divided by 255 on the way in.
use super::{ImageF32, ImageU8};
use crate::error::{Result, StitchError};

const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    w: usize,
    h: usize,
    planes: Vec<ImageF32>,
}

impl Image {
    /// Zero-filled image with `channels` planes.
    pub fn new(w: usize, h: usize, channels: usize) -> Self {
        Self {
            w,
            h,
            planes: (0..channels).map(|_| ImageF32::new(w, h)).collect(),
        }
    }

    /// Assemble an image from same-sized planes.
    pub fn from_planes(planes: Vec<ImageF32>) -> Result<Self> {
        let first = planes
            .first()
            .ok_or_else(|| StitchError::InvalidInput("image needs at least one channel".into()))?;
        let (w, h) = (first.w, first.h);
        if let Some(bad) = planes.iter().find(|p| p.w != w || p.h != h) {
            return Err(StitchError::InvalidInput(format!(
                "channel size {}x{} differs from {}x{}",
                bad.w, bad.h, w, h
            )));
        }
        Ok(Self { w, h, planes })
    }

    /// Single-channel image wrapping one plane.
    pub fn from_plane(plane: ImageF32) -> Self {
        Self {
            w: plane.w,
            h: plane.h,
            planes: vec![plane],
        }
    }

    /// Single-channel image from a borrowed 8-bit grayscale view.
    pub fn from_gray_u8(view: &ImageU8<'_>) -> Self {
        Self::from_plane(view.to_f32())
    }

    /// Decode an interleaved 8-bit buffer (`RGBRGB…`, `GG…`, …).
    pub fn from_interleaved_u8(w: usize, h: usize, channels: usize, data: &[u8]) -> Result<Self> {
        check_interleaved_len(w, h, channels, data.len())?;
        Ok(Self::deinterleave(w, h, channels, |i| data[i] as f32 / 255.0))
    }

    /// Decode an interleaved f32 buffer; values are taken as-is.
    pub fn from_interleaved_f32(
        w: usize,
        h: usize,
        channels: usize,
        data: &[f32],
    ) -> Result<Self> {
        check_interleaved_len(w, h, channels, data.len())?;
        Ok(Self::deinterleave(w, h, channels, |i| data[i]))
    }

    fn deinterleave(w: usize, h: usize, channels: usize, value: impl Fn(usize) -> f32) -> Self {
        let mut planes: Vec<ImageF32> = (0..channels).map(|_| ImageF32::new(w, h)).collect();
        for (c, plane) in planes.iter_mut().enumerate() {
            for (i, px) in plane.data.iter_mut().enumerate() {
                *px = value(i * channels + c);
            }
        }
        Self { w, h, planes }
    }

    /// Encode to an interleaved 8-bit buffer, clamping to `[0, 1]`.
    pub fn to_interleaved_u8(&self) -> Vec<u8> {
        let channels = self.channels();
        let mut out = vec![0u8; self.w * self.h * channels];
        for (c, plane) in self.planes.iter().enumerate() {
            for (i, &v) in plane.data.iter().enumerate() {
                out[i * channels + c] = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
        out
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.w
    }
    #[inline]
    pub fn height(&self) -> usize {
        self.h
    }
    #[inline]
    pub fn channels(&self) -> usize {
        self.planes.len()
    }

    pub fn plane(&self, c: usize) -> &ImageF32 {
        &self.planes[c]
    }

    pub fn planes(&self) -> &[ImageF32] {
        &self.planes
    }

    pub(crate) fn planes_mut(&mut self) -> &mut [ImageF32] {
        &mut self.planes
    }

    pub fn into_planes(self) -> Vec<ImageF32> {
        self.planes
    }

    /// Pixel value of channel `c` at (x, y).
    #[inline]
    pub fn get(&self, x: usize, y: usize, c: usize) -> f32 {
        self.planes[c].get(x, y)
    }

    /// Luminance plane: Rec.601 weights for three or more channels,
    /// the channel mean otherwise.
    pub fn to_gray(&self) -> ImageF32 {
        let mut out = ImageF32::new(self.w, self.h);
        if self.planes.len() >= 3 {
            for (i, px) in out.data.iter_mut().enumerate() {
                *px = LUMA_WEIGHTS
                    .iter()
                    .zip(&self.planes)
                    .map(|(wgt, p)| wgt * p.data[i])
                    .sum();
            }
        } else if !self.planes.is_empty() {
            let norm = 1.0 / self.planes.len() as f32;
            for (i, px) in out.data.iter_mut().enumerate() {
                *px = self.planes.iter().map(|p| p.data[i]).sum::<f32>() * norm;
            }
        }
        out
    }
}

fn check_interleaved_len(w: usize, h: usize, channels: usize, len: usize) -> Result<()> {
    if channels == 0 {
        return Err(StitchError::InvalidInput(
            "image needs at least one channel".into(),
        ));
    }
    if len != w * h * channels {
        return Err(StitchError::InvalidInput(format!(
            "interleaved buffer holds {len} values, expected {w}x{h}x{channels}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_u8_survives_planar_storage() {
        let data: Vec<u8> = (0..24).map(|v| (v * 10) as u8).collect();
        let img = Image::from_interleaved_u8(4, 2, 3, &data).unwrap();
        assert_eq!(img.channels(), 3);
        assert!((img.get(1, 0, 2) - 50.0 / 255.0).abs() < 1e-6);
        assert_eq!(img.to_interleaved_u8(), data);
    }

    #[test]
    fn gray_of_equal_channels_is_identity() {
        let plane = ImageF32::from_fn(3, 3, |x, y| (x + y) as f32 * 0.1);
        let img = Image::from_planes(vec![plane.clone(), plane.clone(), plane.clone()]).unwrap();
        let gray = img.to_gray();
        for (a, b) in gray.data.iter().zip(&plane.data) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn mismatched_planes_are_rejected() {
        let err = Image::from_planes(vec![ImageF32::new(2, 2), ImageF32::new(3, 2)]);
        assert!(err.is_err());
        assert!(Image::from_interleaved_u8(2, 2, 3, &[0u8; 5]).is_err());
        assert!(Image::from_interleaved_f32(2, 2, 1, &[0.0; 3]).is_err());
    }

    #[test]
    fn strided_gray_view_skips_padding() {
        let data = [0u8, 255, 9, 255, 0, 9];
        let view = ImageU8 { w: 2, h: 2, stride: 3, data: &data };
        let img = Image::from_gray_u8(&view);
        assert_eq!(img.channels(), 1);
        assert_eq!(img.get(1, 0, 0), 1.0);
        assert_eq!(img.get(0, 1, 0), 1.0);
        assert_eq!(img.get(1, 1, 0), 0.0);
    }
}
