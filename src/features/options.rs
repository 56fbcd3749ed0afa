use crate::edges::GradientKernel;
use crate::error::{Result, StitchError};

use serde::{Deserialize, Serialize};

/// Scales and threshold of the multi-scale Harris detector.
///
/// - `sigma_d`: pre-smoothing before differentiation.
/// - `sigma_i`: integration scale of the structure tensor.
/// - `sigma_o`: smoothing of the level used for keypoint orientation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HarrisOptions {
    /// Minimum `det/trace` response for a corner candidate.
    pub threshold: f32,
    pub sigma_d: f32,
    pub sigma_i: f32,
    pub sigma_o: f32,
    pub kernel: GradientKernel,
}

impl Default for HarrisOptions {
    fn default() -> Self {
        Self {
            threshold: 1e-4,
            sigma_d: 1.0,
            sigma_i: 1.5,
            sigma_o: 4.5,
            kernel: GradientKernel::Sobel,
        }
    }
}

impl HarrisOptions {
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Feature detection and matching parameters for pairs without manual
/// correspondences.
///
/// `c_robust` and `ratio_threshold` have no sensible universal value and
/// must always be supplied.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    #[serde(default = "default_harris_threshold")]
    pub harris_threshold: f32,
    #[serde(default = "default_pyramid_levels")]
    pub pyramid_levels: usize,
    /// Number of keypoints kept by ANMS.
    #[serde(default = "default_anms_count")]
    pub anms_count: usize,
    /// A neighbour suppresses a candidate only if `R_i < c_robust · R_j`.
    pub c_robust: f32,
    /// Lowe ratio bound on `d1 / d2`.
    pub ratio_threshold: f32,
    #[serde(default = "default_ransac_iterations")]
    pub ransac_iterations: usize,
    /// Inlier transfer-error threshold in pixels.
    #[serde(default = "default_ransac_threshold")]
    pub ransac_threshold: f64,
}

fn default_harris_threshold() -> f32 {
    1e-4
}
fn default_pyramid_levels() -> usize {
    4
}
fn default_anms_count() -> usize {
    500
}
fn default_ransac_iterations() -> usize {
    10_000
}
fn default_ransac_threshold() -> f64 {
    1.0
}

impl DetectionConfig {
    pub fn new(c_robust: f32, ratio_threshold: f32) -> Self {
        Self {
            harris_threshold: default_harris_threshold(),
            pyramid_levels: default_pyramid_levels(),
            anms_count: default_anms_count(),
            c_robust,
            ratio_threshold,
            ransac_iterations: default_ransac_iterations(),
            ransac_threshold: default_ransac_threshold(),
        }
    }

    pub fn with_harris_threshold(mut self, threshold: f32) -> Self {
        self.harris_threshold = threshold;
        self
    }

    pub fn with_pyramid_levels(mut self, levels: usize) -> Self {
        self.pyramid_levels = levels;
        self
    }

    pub fn with_anms_count(mut self, count: usize) -> Self {
        self.anms_count = count;
        self
    }

    pub fn with_ransac(mut self, iterations: usize, threshold: f64) -> Self {
        self.ransac_iterations = iterations;
        self.ransac_threshold = threshold;
        self
    }

    pub fn harris(&self) -> HarrisOptions {
        HarrisOptions::default().with_threshold(self.harris_threshold)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.c_robust > 0.0 && self.c_robust <= 1.0) {
            return Err(StitchError::InvalidInput(format!(
                "c_robust must lie in (0, 1], got {}",
                self.c_robust
            )));
        }
        if !(self.ratio_threshold > 0.0 && self.ratio_threshold <= 1.0) {
            return Err(StitchError::InvalidInput(format!(
                "ratio_threshold must lie in (0, 1], got {}",
                self.ratio_threshold
            )));
        }
        if self.pyramid_levels == 0 {
            return Err(StitchError::InvalidInput(
                "pyramid_levels must be at least 1".into(),
            ));
        }
        if !(self.ransac_threshold > 0.0) {
            return Err(StitchError::InvalidInput(format!(
                "ransac_threshold must be positive, got {}",
                self.ransac_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_fields_must_be_present() {
        let missing = serde_json::from_str::<DetectionConfig>(r#"{"harrisThreshold": 0.001}"#);
        assert!(missing.is_err());
        let cfg: DetectionConfig =
            serde_json::from_str(r#"{"cRobust": 0.9, "ratioThreshold": 0.7}"#).unwrap();
        assert_eq!(cfg.pyramid_levels, 4);
        assert_eq!(cfg.anms_count, 500);
        assert_eq!(cfg.ransac_iterations, 10_000);
        assert!((cfg.harris_threshold - 1e-4).abs() < 1e-12);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn out_of_range_constants_are_rejected() {
        assert!(DetectionConfig::new(1.5, 0.7).validate().is_err());
        assert!(DetectionConfig::new(0.9, 0.0).validate().is_err());
    }
}
