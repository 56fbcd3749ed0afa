use super::MatchStage;
use serde::Serialize;

/// How a pairwise transform was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EstimationMethod {
    /// Four manual correspondences, solved exactly.
    Exact,
    /// Manual correspondences, linear least squares.
    LeastSquares,
    /// Manual translation-only fit on the cylinder.
    Translation,
    /// Robust fit over manual or matched correspondences.
    Ransac,
}

/// Report for one `first → second` pair.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairEstimation {
    pub first: usize,
    pub second: usize,
    pub method: EstimationMethod,
    pub correspondences: usize,
    pub inliers: Vec<usize>,
    pub outliers: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ransac_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inlier_rms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching: Option<MatchStage>,
    /// Row-major `H_first→second`.
    pub homography: [[f64; 3]; 3],
    pub elapsed_ms: f64,
}
