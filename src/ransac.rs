//! Robust homography estimation with RANSAC.
//!
//! All minimal samples are drawn up front from a seeded `StdRng`, so the
//! sample sequence depends only on the seed. Iterations are then scored
//! independently (in parallel when enabled) and reduced to the largest
//! consensus set, the lowest iteration index winning ties. The result is
//! therefore identical for sequential and parallel evaluation.
//!
//! The winning consensus set is refit with the model's least-squares solver.
use crate::error::{Result, StitchError};
use crate::geometry::{
    solve_exact, solve_least_squares, solve_translation, transfer_error, Homography,
};
use crate::types::Correspondence;

use rand::prelude::IndexedRandom;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Consensus floor: a translation agreed on by fewer matches is coincidence.
const MIN_CONSENSUS: usize = 4;

/// Transform family fitted by RANSAC.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MotionModel {
    /// Full 8-DOF homography, minimal sample of 4.
    #[default]
    Projective,
    /// Pure translation, minimal sample of 1.
    Translation,
}

impl MotionModel {
    pub fn min_samples(self) -> usize {
        match self {
            MotionModel::Projective => 4,
            MotionModel::Translation => 1,
        }
    }

    /// Smallest consensus set accepted as a result, for either model.
    pub fn min_inliers(self) -> usize {
        MIN_CONSENSUS
    }

    fn fit_minimal(self, sample: &[Correspondence]) -> Result<Homography> {
        match self {
            MotionModel::Projective => solve_exact(sample),
            MotionModel::Translation => solve_translation(sample),
        }
    }

    /// Overdetermined fit over any number of correspondences.
    pub fn fit(self, correspondences: &[Correspondence]) -> Result<Homography> {
        match self {
            MotionModel::Projective => solve_least_squares(correspondences),
            MotionModel::Translation => solve_translation(correspondences),
        }
    }
}

/// Configuration parameters for the RANSAC engine.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RansacOptions {
    /// Number of minimal samples evaluated (fixed; no early exit).
    pub iterations: usize,
    /// Inlier transfer-error threshold in pixels.
    pub threshold: f64,
    /// Random-number generator seed (for reproducibility).
    pub seed: u64,
    pub model: MotionModel,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            threshold: 1.0,
            seed: 1_234_567,
            model: MotionModel::Projective,
        }
    }
}

impl RansacOptions {
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_model(mut self, model: MotionModel) -> Self {
        self.model = model;
        self
    }
}

/// Output of a successful RANSAC run.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RansacResult {
    /// Least-squares refit over `inliers`.
    pub homography: Homography,
    /// Indices of the winning consensus set, ascending.
    pub inliers: Vec<usize>,
    pub iterations: usize,
    /// Iteration index that produced the consensus set.
    pub best_iteration: usize,
    /// Samples skipped because their minimal fit was degenerate.
    pub skipped_degenerate: usize,
    /// Root-mean-square transfer error of the refit over the inliers.
    pub inlier_rms: f64,
}

impl RansacResult {
    /// Indices not in the consensus set, ascending.
    pub fn outliers(&self, total: usize) -> Vec<usize> {
        let mut is_inlier = vec![false; total];
        for &i in &self.inliers {
            is_inlier[i] = true;
        }
        (0..total).filter(|&i| !is_inlier[i]).collect()
    }
}

fn inlier_indices(h: &Homography, data: &[Correspondence], threshold: f64) -> Vec<usize> {
    data.iter()
        .enumerate()
        .filter(|(_, c)| transfer_error(h, c) < threshold)
        .map(|(i, _)| i)
        .collect()
}

fn rms(h: &Homography, data: &[Correspondence], indices: &[usize]) -> f64 {
    if indices.is_empty() {
        return f64::INFINITY;
    }
    let ss: f64 = indices
        .iter()
        .map(|&i| transfer_error(h, &data[i]).powi(2))
        .sum();
    (ss / indices.len() as f64).sqrt()
}

/// Draw `iterations` samples of `m` distinct indices, stored back to back.
fn draw_samples(n: usize, m: usize, iterations: usize, seed: u64) -> Vec<usize> {
    let all_indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(iterations * m);
    for _ in 0..iterations {
        samples.extend(all_indices.as_slice().choose_multiple(&mut rng, m).copied());
    }
    samples
}

/// Consensus size per iteration; `None` marks a degenerate sample.
fn score_samples(
    data: &[Correspondence],
    samples: &[usize],
    opts: &RansacOptions,
    parallel: bool,
) -> Vec<Option<usize>> {
    let m = opts.model.min_samples();
    let score = |sample: &[usize]| -> Option<usize> {
        let picked: Vec<Correspondence> = sample.iter().map(|&i| data[i]).collect();
        let h = opts.model.fit_minimal(&picked).ok()?;
        Some(
            data.iter()
                .filter(|c| transfer_error(&h, c) < opts.threshold)
                .count(),
        )
    };

    #[cfg(feature = "parallel")]
    if parallel {
        return samples.par_chunks(m).map(score).collect();
    }
    let _ = parallel;
    samples.chunks(m).map(score).collect()
}

/// Largest count wins; ties go to the lowest iteration index.
fn best_iteration(scores: &[Option<usize>]) -> Option<(usize, usize)> {
    scores
        .iter()
        .enumerate()
        .filter_map(|(k, s)| s.map(|count| (k, count)))
        .fold(None, |best, (k, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((k, count)),
        })
}

/// Run RANSAC over `data` with the options' motion model.
pub fn ransac(data: &[Correspondence], opts: &RansacOptions) -> Result<RansacResult> {
    run(data, opts, cfg!(feature = "parallel"))
}

fn run(data: &[Correspondence], opts: &RansacOptions, parallel: bool) -> Result<RansacResult> {
    let m = opts.model.min_samples();
    if data.len() < m {
        return Err(StitchError::InsufficientData {
            needed: m,
            got: data.len(),
            context: "ransac",
        });
    }
    if opts.iterations == 0 || !(opts.threshold > 0.0 && opts.threshold.is_finite()) {
        return Err(StitchError::InvalidInput(format!(
            "ransac needs iterations > 0 and a positive threshold (got {} / {})",
            opts.iterations, opts.threshold
        )));
    }
    log::debug!(
        "ransac start n={} iterations={} threshold={} model={:?}",
        data.len(),
        opts.iterations,
        opts.threshold,
        opts.model
    );

    let samples = draw_samples(data.len(), m, opts.iterations, opts.seed);
    let scores = score_samples(data, &samples, opts, parallel);
    let skipped_degenerate = scores.iter().filter(|s| s.is_none()).count();

    let failure = |best_inliers: usize| StitchError::RansacFailure {
        best_inliers,
        needed: opts.model.min_inliers(),
        iterations: opts.iterations,
        threshold: opts.threshold,
    };
    let (k, count) = best_iteration(&scores).ok_or_else(|| failure(0))?;
    if count < opts.model.min_inliers() {
        return Err(failure(count));
    }

    let sample: Vec<Correspondence> = samples[k * m..(k + 1) * m]
        .iter()
        .map(|&i| data[i])
        .collect();
    let minimal = opts.model.fit_minimal(&sample)?;
    let inliers = inlier_indices(&minimal, data, opts.threshold);
    let consensus: Vec<Correspondence> = inliers.iter().map(|&i| data[i]).collect();
    let homography = opts.model.fit(&consensus)?;
    let inlier_rms = rms(&homography, data, &inliers);

    log::debug!(
        "ransac done inliers={}/{} best_iteration={} skipped={} rms={:.4}",
        inliers.len(),
        data.len(),
        k,
        skipped_degenerate,
        inlier_rms
    );
    Ok(RansacResult {
        homography,
        inliers,
        iterations: opts.iterations,
        best_iteration: k,
        skipped_degenerate,
        inlier_rms,
    })
}
