//! Explicit iterative fold of warped layers into one composite.
use super::StitchOptions;
use crate::blend::{blend_layers, compensate_exposure, Composite, ExposureMode};
use crate::diagnostics::{StitchArtifacts, StitchTrace};
use crate::error::Result;
use crate::geometry::Homography;
use crate::warp::{warp_layer_into, CanvasBounds, Layer};

use std::time::Instant;

/// Fold `layers[order[..]]` onto `layers[reference]`. `homographies[i]`
/// maps layer `i`'s pixels onto the reference surface.
pub fn fold_layers(
    layers: &[Layer],
    homographies: &[Homography],
    reference: usize,
    order: &[usize],
    options: &StitchOptions,
    trace: &mut StitchTrace,
) -> Result<Composite> {
    let mut artifacts = options.keep_artifacts.then(StitchArtifacts::default);
    let seed = layers[reference].clone();
    if let Some(a) = artifacts.as_mut() {
        a.warped.push(seed.clone());
    }
    let mut composite = Composite::from_layer(seed);

    for &i in order {
        let start = Instant::now();
        let source = &layers[i];
        let footprint = CanvasBounds::from_homography(
            &homographies[i],
            source.bounds.width,
            source.bounds.height,
            options.max_canvas_pixels,
        )?;
        let bounds = composite.bounds.union(&footprint);
        bounds.check_size(options.max_canvas_pixels)?;
        log::debug!(
            "fold image={} canvas=({}, {}) {}x{}",
            i,
            bounds.x0,
            bounds.y0,
            bounds.width,
            bounds.height
        );

        let base = composite.padded(bounds)?;
        let mut incoming = warp_layer_into(source, &homographies[i], bounds)?;
        let exposure = (options.exposure.mode != ExposureMode::None)
            .then(|| compensate_exposure(&base, &mut incoming, &options.exposure));
        let outcome = blend_layers(&base, &incoming, &options.blend)?;

        let mut stage = outcome.stage;
        stage.exposure = exposure;
        trace.blends.push(stage);
        if let Some(a) = artifacts.as_mut() {
            a.warped.push(incoming);
            a.distance_fields
                .push((outcome.distance_base, outcome.distance_incoming));
        }
        composite = outcome.composite;
        trace.timings.record(format!("fold:{i}"), start);
    }

    trace.artifacts = artifacts;
    Ok(composite)
}
