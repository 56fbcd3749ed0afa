use super::CanvasBounds;
use crate::error::{Result, StitchError};
use crate::image::{Image, ImageF32};

/// An image placed on the composition surface, with a 0/1 coverage mask.
/// Uncovered pixels hold 0 in every channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub bounds: CanvasBounds,
    pub image: Image,
    pub mask: ImageF32,
}

impl Layer {
    /// Fully uncovered layer.
    pub fn empty(bounds: CanvasBounds, channels: usize) -> Self {
        Self {
            bounds,
            image: Image::new(bounds.width, bounds.height, channels),
            mask: ImageF32::new(bounds.width, bounds.height),
        }
    }

    /// Unwarped image at the origin, fully covered.
    pub fn from_image(image: Image) -> Self {
        let bounds = CanvasBounds::of_image(image.width(), image.height());
        Self {
            mask: ImageF32::filled(bounds.width, bounds.height, 1.0),
            image,
            bounds,
        }
    }

    #[inline]
    pub fn covered(&self, u: usize, v: usize) -> bool {
        self.mask.get(u, v) > 0.5
    }

    pub fn covered_pixels(&self) -> usize {
        self.mask.data.iter().filter(|&&m| m > 0.5).count()
    }

    pub fn channels(&self) -> usize {
        self.image.channels()
    }

    /// Copy this layer into the larger rectangle `bounds`; new pixels are
    /// uncovered.
    pub fn pad_to(&self, bounds: CanvasBounds) -> Result<Layer> {
        if bounds == self.bounds {
            return Ok(self.clone());
        }
        let (ox, oy) = bounds.offset_of(&self.bounds).ok_or_else(|| {
            StitchError::InvalidInput(format!(
                "padding target {bounds:?} does not contain {:?}",
                self.bounds
            ))
        })?;
        let mut out = Layer::empty(bounds, self.channels());
        let w = self.bounds.width;
        for v in 0..self.bounds.height {
            let dst = (oy + v) * bounds.width + ox;
            let src = v * w;
            out.mask.data[dst..dst + w].copy_from_slice(&self.mask.data[src..src + w]);
            for (c, plane) in out.image.planes_mut().iter_mut().enumerate() {
                plane.data[dst..dst + w].copy_from_slice(&self.image.plane(c).data[src..src + w]);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_keeps_pixels_at_their_surface_position() {
        let img = Image::from_plane(ImageF32::from_fn(3, 2, |x, y| (1 + x + 3 * y) as f32));
        let layer = Layer::from_image(img);
        let padded = layer.pad_to(CanvasBounds::new(-2, -1, 6, 4)).unwrap();
        assert_eq!(padded.image.get(2, 1, 0), 1.0);
        assert_eq!(padded.image.get(4, 2, 0), 6.0);
        assert!(padded.covered(3, 1) && !padded.covered(1, 1));
        assert_eq!(padded.covered_pixels(), 6);
        assert!(layer.pad_to(CanvasBounds::new(1, 0, 3, 2)).is_err());
    }
}
