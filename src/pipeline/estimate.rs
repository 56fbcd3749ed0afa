//! Pairwise transform estimation from manual or matched correspondences.
use crate::diagnostics::{elapsed_ms, EstimationMethod, PairEstimation};
use crate::error::{Result, StitchError};
use crate::features::{match_features, DetectionConfig, FeatureSet};
use crate::geometry::{solve_exact, solve_least_squares, solve_translation, Homography};
use crate::ransac::{ransac, MotionModel, RansacOptions, RansacResult};
use crate::types::Correspondence;

use std::time::Instant;

/// `H_first→second` with its report.
#[derive(Clone, Debug)]
pub struct PairEstimate {
    pub homography: Homography,
    pub report: PairEstimation,
}

fn report(
    first: usize,
    second: usize,
    method: EstimationMethod,
    correspondences: usize,
    homography: &Homography,
) -> PairEstimation {
    PairEstimation {
        first,
        second,
        method,
        correspondences,
        inliers: (0..correspondences).collect(),
        outliers: Vec::new(),
        ransac_iterations: None,
        inlier_rms: None,
        matching: None,
        homography: homography.to_rows(),
        elapsed_ms: 0.0,
    }
}

fn robust_report(
    first: usize,
    second: usize,
    correspondences: usize,
    result: &RansacResult,
) -> PairEstimation {
    PairEstimation {
        inliers: result.inliers.clone(),
        outliers: result.outliers(correspondences),
        ransac_iterations: Some(result.iterations),
        inlier_rms: Some(result.inlier_rms),
        ..report(
            first,
            second,
            EstimationMethod::Ransac,
            correspondences,
            &result.homography,
        )
    }
}

/// Fit manual correspondences. `robust` selects RANSAC; otherwise four
/// points are solved exactly and more by least squares.
pub fn estimate_manual(
    first: usize,
    second: usize,
    correspondences: &[Correspondence],
    model: MotionModel,
    robust: Option<&RansacOptions>,
) -> Result<PairEstimate> {
    let start = Instant::now();
    let n = correspondences.len();
    log::debug!(
        "estimate_manual pair={}->{} n={} model={:?} robust={}",
        first,
        second,
        n,
        model,
        robust.is_some()
    );
    let (homography, mut rep) = match robust {
        Some(opts) => {
            let result = ransac(correspondences, &opts.with_model(model))?;
            let rep = robust_report(first, second, n, &result);
            (result.homography, rep)
        }
        None => {
            let (h, method) = match model {
                MotionModel::Translation => {
                    (solve_translation(correspondences)?, EstimationMethod::Translation)
                }
                MotionModel::Projective if n == 4 => {
                    (solve_exact(correspondences)?, EstimationMethod::Exact)
                }
                MotionModel::Projective => (
                    solve_least_squares(correspondences)?,
                    EstimationMethod::LeastSquares,
                ),
            };
            let rep = report(first, second, method, n, &h);
            (h, rep)
        }
    };
    rep.elapsed_ms = elapsed_ms(start);
    Ok(PairEstimate {
        homography,
        report: rep,
    })
}

/// Match two described images and fit the matches with RANSAC, using the
/// detection config's iteration count and threshold.
pub fn estimate_detected(
    first: usize,
    second: usize,
    features_first: &FeatureSet,
    features_second: &FeatureSet,
    config: &DetectionConfig,
    model: MotionModel,
    ransac_base: &RansacOptions,
) -> Result<PairEstimate> {
    let start = Instant::now();
    let (correspondences, matching) =
        match_features(features_first, features_second, config.ratio_threshold)?;
    log::debug!(
        "estimate_detected pair={}->{} matches={}",
        first,
        second,
        correspondences.len()
    );
    if correspondences.len() < model.min_samples() {
        log::warn!(
            "pair {}->{}: only {} mutual matches at ratio {}",
            first,
            second,
            correspondences.len(),
            config.ratio_threshold
        );
        return Err(StitchError::InsufficientData {
            needed: model.min_samples(),
            got: correspondences.len(),
            context: "feature matches",
        });
    }
    let opts = ransac_base
        .with_iterations(config.ransac_iterations)
        .with_threshold(config.ransac_threshold)
        .with_model(model);
    let result = ransac(&correspondences, &opts)?;
    let mut rep = robust_report(first, second, correspondences.len(), &result);
    rep.matching = Some(matching);
    rep.elapsed_ms = elapsed_ms(start);
    Ok(PairEstimate {
        homography: result.homography,
        report: rep,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(h: impl Fn([f64; 2]) -> [f64; 2]) -> Vec<Correspondence> {
        [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [5.0, 3.0]]
            .into_iter()
            .map(|p| Correspondence::new(p, h(p)))
            .collect()
    }

    #[test]
    fn four_points_solve_exactly_and_more_by_least_squares() {
        let c = square(|p| [p[0] + 2.0, p[1] - 1.0]);
        let exact = estimate_manual(0, 1, &c[..4], MotionModel::Projective, None).unwrap();
        assert_eq!(exact.report.method, EstimationMethod::Exact);
        let ls = estimate_manual(0, 1, &c, MotionModel::Projective, None).unwrap();
        assert_eq!(ls.report.method, EstimationMethod::LeastSquares);
        assert_eq!(ls.report.inliers, vec![0, 1, 2, 3, 4]);
        let expected = Homography::translation(2.0, -1.0);
        assert!(exact.homography.max_abs_diff(&expected) < 1e-9);
        assert!(ls.homography.max_abs_diff(&expected) < 1e-9);
    }

    #[test]
    fn too_few_manual_points_fail() {
        let c = square(|p| p);
        let err = estimate_manual(0, 1, &c[..3], MotionModel::Projective, None).unwrap_err();
        assert!(matches!(err, StitchError::InsufficientData { needed: 4, got: 3, .. }));
    }

    #[test]
    fn robust_manual_reports_outliers() {
        let mut c = square(|p| [p[0] * 1.5, p[1] * 1.5 + 4.0]);
        c.push(Correspondence::new([3.0, 7.0], [40.0, -9.0]));
        let opts = RansacOptions::default().with_iterations(200);
        let est = estimate_manual(0, 1, &c, MotionModel::Projective, Some(&opts)).unwrap();
        assert_eq!(est.report.method, EstimationMethod::Ransac);
        assert_eq!(est.report.outliers, vec![5]);
        assert_eq!(est.report.inliers.len(), 5);
    }

    #[test]
    fn translation_model_uses_mean_shift() {
        let c = square(|p| [p[0] - 30.0, p[1] + 0.5]);
        let est = estimate_manual(0, 1, &c, MotionModel::Translation, None).unwrap();
        assert_eq!(est.report.method, EstimationMethod::Translation);
        assert!(est
            .homography
            .max_abs_diff(&Homography::translation(-30.0, 0.5))
            < 1e-9);
    }
}
