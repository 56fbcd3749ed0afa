//! Automatic correspondence search: multi-scale Harris corners, adaptive
//! non-maximal suppression, MOPS descriptors and ratio/mutual matching.
//!
//! [`detect_features`] chains the per-image stages; [`match_features`] pairs
//! two detected sets into level-0 correspondences.

pub mod anms;
pub mod coverage;
pub mod descriptor;
pub mod harris;
pub mod matcher;
pub mod options;
pub mod spatial;

pub use anms::{anms, suppression_radii, RankedKeypoint};
pub use coverage::{retain_covered, CoverageGate};
pub use descriptor::{describe_keypoints, MopsExtractor};
pub use harris::{detect_corners, harris_response};
pub use matcher::{match_descriptors, to_correspondences, FeatureMatch};
pub use options::{DetectionConfig, HarrisOptions};
pub use spatial::{KdTree, Neighbor};

use crate::diagnostics::timing::elapsed_ms;
use crate::diagnostics::{FeatureStage, MatchStage, PyramidStage};
use crate::error::{Result, StitchError};
use crate::image::ImageF32;
use crate::pyramid::{build_pyramid, PyramidOptions};
use crate::types::{Correspondence, Descriptor, Keypoint};

use std::time::Instant;

/// Described keypoints of one image.
#[derive(Clone, Debug)]
pub struct FeatureSet {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

/// Detect, select and describe keypoints on a luminance plane.
///
/// With a `coverage` mask, candidates whose support touches uncovered pixels
/// are discarded before selection. Fails with `NoFeaturesFound` when no
/// keypoint survives detection, the coverage gate or description.
pub fn detect_features(
    gray: &ImageF32,
    coverage: Option<&ImageF32>,
    config: &DetectionConfig,
) -> Result<(FeatureSet, FeatureStage)> {
    config.validate()?;
    if let Some(mask) = coverage {
        if (mask.w, mask.h) != (gray.w, gray.h) {
            return Err(StitchError::InvalidInput(format!(
                "coverage mask {}x{} does not match the {}x{} image",
                mask.w, mask.h, gray.w, gray.h
            )));
        }
    }
    log::debug!(
        "detect_features start w={} h={} levels={} anms={}",
        gray.w,
        gray.h,
        config.pyramid_levels,
        config.anms_count
    );
    let pyr = build_pyramid(gray.clone(), PyramidOptions::new(config.pyramid_levels));
    let pyramid = pyr.pyramid;
    let mut stage = FeatureStage {
        pyramid: PyramidStage::from_pyramid(&pyramid, pyr.elapsed_ms),
        ..FeatureStage::default()
    };

    let start = Instant::now();
    let candidates = detect_corners(&pyramid, &config.harris())?;
    stage.harris_ms = elapsed_ms(start);
    stage.candidates = candidates.len();
    stage.candidates_per_level = vec![0; pyramid.levels.len()];
    for kp in &candidates {
        stage.candidates_per_level[kp.level] += 1;
    }
    let no_features = || StitchError::NoFeaturesFound {
        threshold: config.harris_threshold,
        levels: pyramid.levels.len(),
    };
    let candidates = match coverage {
        Some(mask) => {
            let kept = retain_covered(candidates, mask);
            stage.outside_coverage = stage.candidates - kept.len();
            kept
        }
        None => candidates,
    };
    if candidates.is_empty() {
        log::warn!(
            "detect_features: all {} candidates touch uncovered pixels",
            stage.candidates
        );
        return Err(no_features());
    }

    let start = Instant::now();
    let ranked = anms(&candidates, config.anms_count, config.c_robust);
    stage.anms_ms = elapsed_ms(start);
    stage.after_anms = ranked.len();
    stage.min_radius = ranked.last().map(|r| r.radius);
    let selected: Vec<Keypoint> = ranked.iter().map(|r| r.keypoint).collect();

    let start = Instant::now();
    let (keypoints, descriptors) = describe_keypoints(&pyramid, &selected);
    stage.descriptor_ms = elapsed_ms(start);
    stage.described = keypoints.len();
    stage.dropped_at_border = selected.len() - keypoints.len();
    if keypoints.is_empty() {
        log::warn!(
            "detect_features: all {} selected keypoints dropped at the border",
            selected.len()
        );
        return Err(no_features());
    }

    Ok((
        FeatureSet {
            keypoints,
            descriptors,
        },
        stage,
    ))
}

/// Mutual ratio-test matches between two feature sets, as level-0
/// correspondences from `first` to `second`.
pub fn match_features(
    first: &FeatureSet,
    second: &FeatureSet,
    ratio_threshold: f32,
) -> Result<(Vec<Correspondence>, MatchStage)> {
    let start = Instant::now();
    let matches = match_descriptors(&first.descriptors, &second.descriptors, ratio_threshold)?;
    let correspondences = to_correspondences(&matches, &first.keypoints, &second.keypoints);
    let stage = MatchStage {
        descriptors_first: first.descriptors.len(),
        descriptors_second: second.descriptors.len(),
        mutual_matches: matches.len(),
        ratio_threshold,
        elapsed_ms: elapsed_ms(start),
    };
    Ok((correspondences, stage))
}
