use super::{BlendStage, FeatureStage, PairEstimation, TimingBreakdown};
use crate::blend::DistanceField;
use crate::warp::Layer;
use serde::Serialize;

/// End-to-end trace of a stitching run.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StitchTrace {
    pub inputs: Vec<InputDescriptor>,
    pub surface: String,
    pub timings: TimingBreakdown,
    pub pairs: Vec<PairEstimation>,
    pub features: Vec<FeatureStage>,
    pub blends: Vec<BlendStage>,
    #[serde(skip)]
    pub artifacts: Option<StitchArtifacts>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
}

/// Intermediate buffers kept on request for external reporting.
#[derive(Clone, Debug, Default)]
pub struct StitchArtifacts {
    /// Each image warped onto its fold step's canvas, in composition order.
    pub warped: Vec<Layer>,
    /// `(composite, incoming)` distance fields of each blend step.
    pub distance_fields: Vec<(DistanceField, DistanceField)>,
}
