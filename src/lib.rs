#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod blend;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod image;
pub mod pipeline;
pub mod types;
pub mod warp;

// Building blocks of the feature path; public for tools and experiments.
pub mod config;
pub mod edges;
pub mod features;
pub mod pyramid;
pub mod ransac;

// --- High-level re-exports -------------------------------------------------

// Main entry points: stitcher, its options and its output.
pub use crate::pipeline::{stitch, PairLink, PairSource, StitchOptions, StitchOutput, Stitcher, Surface};

pub use crate::error::{Result, StitchError};
pub use crate::geometry::Homography;
pub use crate::types::{Correspondence, Descriptor, Keypoint};

// Diagnostics returned with every composite.
pub use crate::diagnostics::StitchTrace;

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use mosaic_stitch::prelude::*;
///
/// # fn main() -> mosaic_stitch::Result<()> {
/// let (w, h) = (320usize, 240usize);
/// let left = Image::from_interleaved_u8(w, h, 1, &vec![128u8; w * h])?;
/// let right = left.clone();
///
/// let pairs = vec![PairLink::detect(0, 1)];
/// let options = StitchOptions::default().with_detection(DetectionConfig::new(0.9, 0.7));
/// let out = Stitcher::new(options).stitch(&[left, right], &pairs)?;
/// println!("canvas={:?} total_ms={:.3}", out.composite.bounds, out.trace.timings.total_ms);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::blend::{BlendMode, ExposureOptions};
    pub use crate::features::DetectionConfig;
    pub use crate::image::{Image, ImageF32, ImageU8};
    pub use crate::ransac::RansacOptions;
    pub use crate::{Correspondence, Homography, PairLink, StitchOptions, Stitcher, Surface};
}

// --- Stage-level API (for tools & advanced users) ---------------------------

pub mod stages {
    // Stage runners.
    pub use crate::blend::{blend_layers, compensate_exposure, distance_transform};
    pub use crate::features::{detect_features, match_features};
    pub use crate::pipeline::{estimate_detected, estimate_manual, fold_layers};
    pub use crate::ransac::ransac;
    pub use crate::warp::{warp_cylindrical, warp_into, warp_planar};

    // Structured diagnostics types.
    pub use crate::diagnostics::{
        BlendStage, EstimationMethod, FeatureStage, InputDescriptor, MatchStage, PairEstimation,
        PyramidLevelReport, PyramidStage, StageTiming, StitchArtifacts, TimingBreakdown,
    };
}
