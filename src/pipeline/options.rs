//! Inputs and options of a stitching run.
//!
//! Defaults compose onto a planar surface with two-band blending and no
//! exposure compensation. Automatic correspondence search additionally needs
//! a [`DetectionConfig`], which has no defaults for its matching constants.

use crate::blend::{BlendMode, ExposureOptions};
use crate::features::DetectionConfig;
use crate::ransac::RansacOptions;
use crate::types::Correspondence;

use serde::{Deserialize, Serialize};

/// Composition surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Surface {
    /// The reference image's plane; pairs are related by homographies.
    #[default]
    Planar,
    /// A cylinder around the camera's vertical axis; every image is
    /// reprojected first and pairs are related by translations.
    Cylindrical {
        #[serde(rename = "focalPx")]
        focal_px: f64,
    },
}

/// Where a pair's correspondences come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PairSource {
    /// Points in `first` (`src`) and `second` (`dst`), in source pixels.
    Manual(Vec<Correspondence>),
    /// Detect, describe and match features in both images.
    Detect,
}

/// An edge of the pair graph: estimate `H_first→second`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairLink {
    pub first: usize,
    pub second: usize,
    pub source: PairSource,
}

impl PairLink {
    pub fn manual(first: usize, second: usize, correspondences: Vec<Correspondence>) -> Self {
        Self {
            first,
            second,
            source: PairSource::Manual(correspondences),
        }
    }

    pub fn detect(first: usize, second: usize) -> Self {
        Self {
            first,
            second,
            source: PairSource::Detect,
        }
    }
}

/// Options for a whole stitching run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StitchOptions {
    pub surface: Surface,
    /// Fit manual correspondences with RANSAC instead of a direct solve.
    pub robust_manual: bool,
    /// Composition order of the non-reference images. `None` folds them by
    /// increasing hop distance from the reference, then by index.
    pub order: Option<Vec<usize>>,
    pub blend: BlendMode,
    pub exposure: ExposureOptions,
    /// Required when any pair uses [`PairSource::Detect`].
    pub detection: Option<DetectionConfig>,
    /// Seed and defaults for robust fits. Detected pairs take iteration
    /// count and threshold from `detection`.
    pub ransac: RansacOptions,
    /// Keep warped layers and distance fields in the trace.
    pub keep_artifacts: bool,
    /// Upper bound on canvas area.
    pub max_canvas_pixels: usize,
}

impl Default for StitchOptions {
    fn default() -> Self {
        Self {
            surface: Surface::Planar,
            robust_manual: false,
            order: None,
            blend: BlendMode::default(),
            exposure: ExposureOptions::default(),
            detection: None,
            ransac: RansacOptions::default(),
            keep_artifacts: false,
            max_canvas_pixels: 64 * 1024 * 1024,
        }
    }
}

impl StitchOptions {
    pub fn with_surface(mut self, surface: Surface) -> Self {
        self.surface = surface;
        self
    }

    pub fn with_robust_manual(mut self, robust: bool) -> Self {
        self.robust_manual = robust;
        self
    }

    pub fn with_order(mut self, order: Vec<usize>) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_exposure(mut self, exposure: ExposureOptions) -> Self {
        self.exposure = exposure;
        self
    }

    pub fn with_detection(mut self, detection: DetectionConfig) -> Self {
        self.detection = Some(detection);
        self
    }

    pub fn with_ransac(mut self, ransac: RansacOptions) -> Self {
        self.ransac = ransac;
        self
    }

    pub fn with_artifacts(mut self, keep: bool) -> Self {
        self.keep_artifacts = keep;
        self
    }

    pub fn with_max_canvas_pixels(mut self, pixels: usize) -> Self {
        self.max_canvas_pixels = pixels;
        self
    }
}
