//! Error type shared by every stage of the stitcher.
//!
//! Recoverable conditions (degenerate RANSAC samples, border keypoints) are
//! handled locally by the stage that hits them; everything here is what a
//! caller can observe.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StitchError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StitchError {
    #[error("{context}: need at least {needed} correspondences, got {got}")]
    InsufficientData {
        needed: usize,
        got: usize,
        context: &'static str,
    },
    #[error("degenerate configuration: {reason}")]
    DegenerateConfiguration { reason: String },
    #[error("no features above harris threshold {threshold:e} on {levels} pyramid level(s)")]
    NoFeaturesFound { threshold: f32, levels: usize },
    #[error("point ({x:.2}, {y:.2}) outside the {width}x{height} source extent")]
    OutOfBounds {
        x: f64,
        y: f64,
        width: usize,
        height: usize,
    },
    #[error(
        "ransac found only {best_inliers} inliers (need {needed}) after {iterations} iterations at threshold {threshold}px"
    )]
    RansacFailure {
        best_inliers: usize,
        needed: usize,
        iterations: usize,
        threshold: f64,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StitchError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateConfiguration {
            reason: reason.into(),
        }
    }
}
