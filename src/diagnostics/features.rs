use super::PyramidStage;
use serde::{Deserialize, Serialize};

/// Counts and timings of the detect → ANMS → describe chain for one image.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStage {
    pub image: usize,
    pub pyramid: PyramidStage,
    /// Harris candidates per pyramid level.
    pub candidates_per_level: Vec<usize>,
    pub candidates: usize,
    /// Candidates rejected because their support touches uncovered pixels.
    pub outside_coverage: usize,
    pub after_anms: usize,
    /// Keypoints dropped because their descriptor window left the level.
    pub dropped_at_border: usize,
    pub described: usize,
    /// Smallest suppression radius among retained keypoints (level-0 px).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_radius: Option<f32>,
    pub harris_ms: f64,
    pub anms_ms: f64,
    pub descriptor_ms: f64,
}

/// Outcome of descriptor matching for one image pair.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStage {
    pub descriptors_first: usize,
    pub descriptors_second: usize,
    pub mutual_matches: usize,
    pub ratio_threshold: f32,
    pub elapsed_ms: f64,
}
