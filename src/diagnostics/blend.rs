use crate::blend::{ExposureReport, SolverReport};
use crate::warp::CanvasBounds;
use serde::Serialize;

/// One fold step: the incoming image blended onto the running composite.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlendStage {
    pub mode: String,
    pub canvas: CanvasBounds,
    pub overlap_pixels: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solver: Option<SolverReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure: Option<ExposureReport>,
    pub distance_ms: f64,
    pub blend_ms: f64,
}
