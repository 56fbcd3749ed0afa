//! Per-channel gain/bias exposure compensation.
//!
//! The incoming layer is mapped so that its mean and standard deviation over
//! the overlap match the composite's: `gain = σ_base / σ_in`,
//! `bias = μ_base − gain·μ_in`. The correction is applied to every covered
//! pixel of the incoming layer.
use crate::warp::Layer;

use serde::{Deserialize, Serialize};

const GAIN_MIN: f32 = 0.5;
const GAIN_MAX: f32 = 2.0;
const STD_EPS: f64 = 1e-6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExposureMode {
    #[default]
    None,
    GainBias,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExposureOptions {
    pub mode: ExposureMode,
    /// Overlap below this many pixels leaves the incoming layer untouched.
    pub min_overlap_pixels: usize,
}

impl Default for ExposureOptions {
    fn default() -> Self {
        Self {
            mode: ExposureMode::None,
            min_overlap_pixels: 64,
        }
    }
}

impl ExposureOptions {
    pub fn gain_bias() -> Self {
        Self {
            mode: ExposureMode::GainBias,
            ..Self::default()
        }
    }

    pub fn with_min_overlap(mut self, pixels: usize) -> Self {
        self.min_overlap_pixels = pixels;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ChannelGain {
    pub gain: f32,
    pub bias: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureReport {
    pub overlap_pixels: usize,
    pub applied: bool,
    pub channels: Vec<ChannelGain>,
}

/// Adjust `incoming` in place towards `base`. Both layers must share bounds.
pub fn compensate_exposure(
    base: &Layer,
    incoming: &mut Layer,
    options: &ExposureOptions,
) -> ExposureReport {
    let mut report = ExposureReport::default();
    if options.mode == ExposureMode::None || base.bounds != incoming.bounds {
        return report;
    }
    let overlap: Vec<usize> = base
        .mask
        .data
        .iter()
        .zip(&incoming.mask.data)
        .enumerate()
        .filter(|(_, (&a, &b))| a > 0.5 && b > 0.5)
        .map(|(i, _)| i)
        .collect();
    report.overlap_pixels = overlap.len();
    if overlap.len() < options.min_overlap_pixels.max(1) {
        log::warn!(
            "exposure compensation skipped: overlap {} px < {} px",
            overlap.len(),
            options.min_overlap_pixels
        );
        return report;
    }

    let channels = incoming.channels().min(base.channels());
    for c in 0..channels {
        let (mu_b, sd_b) = moments(&base.image.plane(c).data, &overlap);
        let (mu_i, sd_i) = moments(&incoming.image.plane(c).data, &overlap);
        let gain = if sd_i > STD_EPS {
            ((sd_b / sd_i) as f32).clamp(GAIN_MIN, GAIN_MAX)
        } else {
            1.0
        };
        let bias = mu_b as f32 - gain * mu_i as f32;
        report.channels.push(ChannelGain { gain, bias });
    }

    let mask = &incoming.mask;
    for (plane, g) in incoming.image.planes_mut().iter_mut().zip(&report.channels) {
        for (v, &m) in plane.data.iter_mut().zip(&mask.data) {
            if m > 0.5 {
                *v = g.gain * *v + g.bias;
            }
        }
    }
    report.applied = true;
    log::debug!(
        "compensate_exposure overlap={} gains={:?}",
        report.overlap_pixels,
        report.channels
    );
    report
}

fn moments(data: &[f32], idx: &[usize]) -> (f64, f64) {
    let n = idx.len() as f64;
    let mean = idx.iter().map(|&i| data[i] as f64).sum::<f64>() / n;
    let var = idx
        .iter()
        .map(|&i| {
            let d = data[i] as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}
