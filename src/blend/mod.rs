//! Compositing a warped layer onto the running composite.
//!
//! - `distance`: Euclidean distance transform of coverage masks.
//! - `two_band`: low/high band split with distance-weighted low band.
//! - `poisson`: gradient-domain blending solved with conjugate gradients.
//! - `exposure`: gain/bias compensation of the incoming layer.
//! - `canvas`: the accumulation buffer and the finished composite.

pub mod canvas;
pub mod distance;
pub mod exposure;
pub mod poisson;
pub mod two_band;

pub use canvas::{Canvas, Composite};
pub use distance::{distance_transform, DistanceField};
pub use exposure::{compensate_exposure, ChannelGain, ExposureMode, ExposureOptions, ExposureReport};
pub use poisson::{conjugate_gradient, gradient_domain_blend, CsrMatrix, GradientDomainOptions, SolverReport};
pub use two_band::{low_band_weights, split_bands, two_band_blend};

use crate::diagnostics::{elapsed_ms, BlendStage};
use crate::error::{Result, StitchError};
use crate::warp::Layer;

use serde::{Deserialize, Serialize};
use std::time::Instant;

fn default_sigma() -> f32 {
    two_band::DEFAULT_SIGMA
}

/// How overlapping pixels are combined.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum BlendMode {
    TwoBand {
        #[serde(default = "default_sigma")]
        sigma: f32,
    },
    GradientDomain(GradientDomainOptions),
}

impl Default for BlendMode {
    fn default() -> Self {
        BlendMode::TwoBand {
            sigma: two_band::DEFAULT_SIGMA,
        }
    }
}

impl BlendMode {
    pub fn gradient_domain() -> Self {
        BlendMode::GradientDomain(GradientDomainOptions::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlendMode::TwoBand { .. } => "twoBand",
            BlendMode::GradientDomain(_) => "gradientDomain",
        }
    }
}

/// Result of one blend step with the distance fields it used.
#[derive(Clone, Debug)]
pub struct BlendOutcome {
    pub composite: Composite,
    pub stage: BlendStage,
    pub distance_base: DistanceField,
    pub distance_incoming: DistanceField,
}

/// Blend `incoming` over `base`. Both layers must already lie on the same
/// canvas rectangle.
pub fn blend_layers(base: &Layer, incoming: &Layer, mode: &BlendMode) -> Result<BlendOutcome> {
    if base.bounds != incoming.bounds {
        return Err(StitchError::InvalidInput(format!(
            "blend layers differ in bounds: {:?} vs {:?}",
            base.bounds, incoming.bounds
        )));
    }
    let t_dist = Instant::now();
    let distance_base = distance_transform(&base.mask);
    let distance_incoming = distance_transform(&incoming.mask);
    let distance_ms = elapsed_ms(t_dist);

    let overlap_pixels = base
        .mask
        .data
        .iter()
        .zip(&incoming.mask.data)
        .filter(|(&a, &b)| a > 0.5 && b > 0.5)
        .count();
    log::debug!(
        "blend_layers mode={} canvas={}x{} overlap={}",
        mode.name(),
        base.bounds.width,
        base.bounds.height,
        overlap_pixels
    );

    let t_blend = Instant::now();
    let (composite, solver) = match mode {
        BlendMode::TwoBand { sigma } => (
            two_band_blend(base, incoming, &distance_base, &distance_incoming, *sigma)?,
            None,
        ),
        BlendMode::GradientDomain(opts) => {
            let (c, report) =
                gradient_domain_blend(base, incoming, &distance_base, &distance_incoming, opts)?;
            (c, Some(report))
        }
    };
    let stage = BlendStage {
        mode: mode.name().to_string(),
        canvas: base.bounds,
        overlap_pixels,
        solver,
        exposure: None,
        distance_ms,
        blend_ms: elapsed_ms(t_blend),
    };
    Ok(BlendOutcome {
        composite,
        stage,
        distance_base,
        distance_incoming,
    })
}
