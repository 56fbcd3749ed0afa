use crate::error::Result;
use crate::image::{Image, ImageF32};
use crate::warp::{CanvasBounds, Layer};

/// Mutable accumulation buffer owned by a single fold step.
#[derive(Debug)]
pub struct Canvas {
    bounds: CanvasBounds,
    image: Image,
    coverage: ImageF32,
}

impl Canvas {
    pub fn new(bounds: CanvasBounds, channels: usize) -> Self {
        Self {
            bounds,
            image: Image::new(bounds.width, bounds.height, channels),
            coverage: ImageF32::new(bounds.width, bounds.height),
        }
    }

    pub fn bounds(&self) -> CanvasBounds {
        self.bounds
    }

    /// Replace channel `c` wholesale and mark `covered` pixels.
    pub(crate) fn put_plane(&mut self, c: usize, plane: ImageF32, covered: &ImageF32) {
        self.image.planes_mut()[c] = plane;
        for (dst, &m) in self.coverage.data.iter_mut().zip(&covered.data) {
            if m > 0.5 {
                *dst = 1.0;
            }
        }
    }

    pub fn finalize(self) -> Composite {
        Composite {
            image: self.image,
            coverage: self.coverage,
            bounds: self.bounds,
        }
    }
}

/// Finished, immutable composite; the input of the next fold step.
#[derive(Clone, Debug, PartialEq)]
pub struct Composite {
    pub image: Image,
    pub coverage: ImageF32,
    pub bounds: CanvasBounds,
}

impl Composite {
    pub fn from_layer(layer: Layer) -> Self {
        Self {
            image: layer.image,
            coverage: layer.mask,
            bounds: layer.bounds,
        }
    }

    pub fn to_layer(&self) -> Layer {
        Layer {
            bounds: self.bounds,
            image: self.image.clone(),
            mask: self.coverage.clone(),
        }
    }

    /// The composite re-embedded in the larger rectangle `bounds`.
    pub fn padded(&self, bounds: CanvasBounds) -> Result<Layer> {
        self.to_layer().pad_to(bounds)
    }

    pub fn covered_pixels(&self) -> usize {
        self.coverage.data.iter().filter(|&&m| m > 0.5).count()
    }
}
