use serde::{Deserialize, Serialize};

/// Number of samples in a MOPS descriptor (8×8 grid).
pub const DESCRIPTOR_LEN: usize = 64;

/// Corner found by the Harris detector.
///
/// `x`/`y` are expressed in the frame of pyramid level `level`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub level: usize,
    pub response: f32,
    /// Dominant gradient direction in radians, `(-π, π]`.
    pub orientation: f32,
}

impl Keypoint {
    /// Position in level-0 (full resolution) pixel coordinates.
    pub fn position_l0(&self) -> [f64; 2] {
        let s = crate::pyramid::level_scale(self.level);
        [self.x as f64 * s, self.y as f64 * s]
    }
}

/// Zero-mean, unit-variance patch descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptor(pub [f32; DESCRIPTOR_LEN]);

impl Descriptor {
    /// Normalise raw samples; a flat patch becomes the zero vector.
    pub fn from_samples(mut samples: [f32; DESCRIPTOR_LEN]) -> Self {
        let n = DESCRIPTOR_LEN as f32;
        let mean = samples.iter().sum::<f32>() / n;
        let var = samples.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
        let std = var.sqrt();
        for v in &mut samples {
            *v = if std > 1e-8 { (*v - mean) / std } else { 0.0 };
        }
        Self(samples)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Squared Euclidean distance to `other`.
    #[inline]
    pub fn distance_sq(&self, other: &Descriptor) -> f32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// Point pair: `src` in the first image maps to `dst` in the second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub src: [f64; 2],
    pub dst: [f64; 2],
}

impl Correspondence {
    pub fn new(src: [f64; 2], dst: [f64; 2]) -> Self {
        Self { src, dst }
    }

    /// Same pair with the roles of the two images swapped.
    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
        }
    }
}
