use serde::Deserialize;

/// Options controlling pyramid construction. Every decimation is preceded by
/// the 5-tap Gaussian.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct PyramidOptions {
    /// Number of pyramid levels (>= 1).
    pub levels: usize,
}

impl Default for PyramidOptions {
    fn default() -> Self {
        Self::new(4)
    }
}

impl PyramidOptions {
    pub fn new(levels: usize) -> Self {
        Self { levels }
    }
}
