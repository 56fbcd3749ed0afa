use super::estimate::{estimate_detected, estimate_manual, PairEstimate};
use super::fold::fold_layers;
use super::graph::{composition_order, PairGraph};
use super::options::{PairLink, PairSource, StitchOptions, Surface};
use crate::blend::Composite;
use crate::diagnostics::{elapsed_ms, InputDescriptor, StitchTrace};
use crate::error::{Result, StitchError};
use crate::features::{detect_features, DetectionConfig, FeatureSet};
use crate::geometry::Homography;
use crate::image::Image;
use crate::ransac::MotionModel;
use crate::types::Correspondence;
use crate::warp::{warp_cylindrical, CylindricalProjection, Layer};

use std::time::Instant;

/// Result of a stitching run.
#[derive(Clone, Debug)]
pub struct StitchOutput {
    pub composite: Composite,
    /// Image whose frame is the composition surface.
    pub reference: usize,
    /// Full composition order, reference first.
    pub order: Vec<usize>,
    /// `H_i→reference` for every image `i` (on the cylinder for cylindrical
    /// surfaces).
    pub homographies: Vec<Homography>,
    pub trace: StitchTrace,
}

/// Stitches an ordered image set given its pair graph.
///
/// ```no_run
/// use mosaic_stitch::image::Image;
/// use mosaic_stitch::pipeline::{PairLink, StitchOptions, Stitcher};
/// use mosaic_stitch::types::Correspondence;
///
/// # fn example(a: Image, b: Image) -> mosaic_stitch::Result<()> {
/// let pairs = vec![PairLink::manual(
///     0,
///     1,
///     vec![
///         Correspondence::new([10.0, 10.0], [2.0, 11.0]),
///         Correspondence::new([90.0, 12.0], [82.0, 13.0]),
///         Correspondence::new([88.0, 70.0], [80.0, 71.0]),
///         Correspondence::new([12.0, 68.0], [4.0, 69.0]),
///     ],
/// )];
/// let out = Stitcher::new(StitchOptions::default()).stitch(&[a, b], &pairs)?;
/// println!("reference={} canvas={:?}", out.reference, out.composite.bounds);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Stitcher {
    options: StitchOptions,
}

impl Stitcher {
    pub fn new(options: StitchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &StitchOptions {
        &self.options
    }

    pub fn stitch(&self, images: &[Image], pairs: &[PairLink]) -> Result<StitchOutput> {
        let total = Instant::now();
        let opts = &self.options;
        validate_images(images)?;
        log::debug!(
            "Stitcher::stitch start images={} pairs={} surface={:?}",
            images.len(),
            pairs.len(),
            opts.surface
        );
        let mut trace = StitchTrace {
            inputs: images
                .iter()
                .map(|img| InputDescriptor {
                    width: img.width(),
                    height: img.height(),
                    channels: img.channels(),
                })
                .collect(),
            surface: match opts.surface {
                Surface::Planar => "planar".to_string(),
                Surface::Cylindrical { .. } => "cylindrical".to_string(),
            },
            ..StitchTrace::default()
        };

        let edges: Vec<(usize, usize)> = pairs.iter().map(|p| (p.first, p.second)).collect();
        let graph = PairGraph::new(images.len(), &edges)?;
        graph.ensure_connected()?;

        let start = Instant::now();
        let (layers, projections) = prepare_layers(images, &opts.surface)?;
        if projections.iter().any(Option::is_some) {
            trace.timings.record("cylindrical", start);
        }

        let model = match opts.surface {
            Surface::Planar => MotionModel::Projective,
            Surface::Cylindrical { .. } => MotionModel::Translation,
        };
        let features = describe_detected(pairs, &layers, opts.detection.as_ref(), &mut trace)?;
        let mut pair_h = Vec::with_capacity(pairs.len());
        for link in pairs {
            let start = Instant::now();
            let estimate = match &link.source {
                PairSource::Manual(points) => {
                    let points = match (&projections[link.first], &projections[link.second]) {
                        (Some(pa), Some(pb)) => project_points(points, pa, pb),
                        _ => points.clone(),
                    };
                    let robust = opts.robust_manual.then_some(&opts.ransac);
                    estimate_manual(link.first, link.second, &points, model, robust)?
                }
                PairSource::Detect => {
                    let (Some(config), Some(fa), Some(fb)) = (
                        opts.detection.as_ref(),
                        features[link.first].as_ref(),
                        features[link.second].as_ref(),
                    ) else {
                        return Err(missing_detection(link));
                    };
                    estimate_detected(link.first, link.second, fa, fb, config, model, &opts.ransac)?
                }
            };
            let PairEstimate { homography, report } = estimate;
            trace.pairs.push(report);
            trace
                .timings
                .record(format!("pair:{}-{}", link.first, link.second), start);
            pair_h.push(homography);
        }

        let reference = graph.centre();
        let tree = graph.bfs(reference);
        let mut homographies = vec![Homography::identity(); images.len()];
        for &i in tree.visit_order.iter().skip(1) {
            let Some((parent, edge)) = tree.parent[i] else {
                continue;
            };
            let to_parent = if pairs[edge].first == i {
                pair_h[edge]
            } else {
                pair_h[edge].inverse()?
            };
            homographies[i] = homographies[parent].compose(&to_parent)?;
        }
        let rest = composition_order(&tree, opts.order.as_deref())?;
        log::debug!("Stitcher::stitch reference={} order={:?}", reference, rest);

        let composite = fold_layers(&layers, &homographies, reference, &rest, opts, &mut trace)?;
        trace.timings.total_ms = elapsed_ms(total);

        let mut order = Vec::with_capacity(images.len());
        order.push(reference);
        order.extend(rest);
        Ok(StitchOutput {
            composite,
            reference,
            order,
            homographies,
            trace,
        })
    }
}

/// Stitch with a one-off [`Stitcher`].
pub fn stitch(images: &[Image], pairs: &[PairLink], options: &StitchOptions) -> Result<StitchOutput> {
    Stitcher::new(options.clone()).stitch(images, pairs)
}

fn validate_images(images: &[Image]) -> Result<()> {
    let first = images
        .first()
        .ok_or_else(|| StitchError::InvalidInput("no images to stitch".into()))?;
    for (i, img) in images.iter().enumerate() {
        if img.width() == 0 || img.height() == 0 {
            return Err(StitchError::InvalidInput(format!("image {i} is empty")));
        }
        if img.channels() != first.channels() {
            return Err(StitchError::InvalidInput(format!(
                "image {i} has {} channels, image 0 has {}",
                img.channels(),
                first.channels()
            )));
        }
    }
    Ok(())
}

type PreparedLayers = (Vec<Layer>, Vec<Option<CylindricalProjection>>);

fn prepare_layers(images: &[Image], surface: &Surface) -> Result<PreparedLayers> {
    match *surface {
        Surface::Planar => Ok((
            images.iter().cloned().map(Layer::from_image).collect(),
            vec![None; images.len()],
        )),
        Surface::Cylindrical { focal_px } => {
            let mut layers = Vec::with_capacity(images.len());
            let mut projections = Vec::with_capacity(images.len());
            for img in images {
                let proj = CylindricalProjection::for_image(focal_px, img.width(), img.height())?;
                layers.push(warp_cylindrical(img, &proj));
                projections.push(Some(proj));
            }
            Ok((layers, projections))
        }
    }
}

fn project_points(
    points: &[Correspondence],
    first: &CylindricalProjection,
    second: &CylindricalProjection,
) -> Vec<Correspondence> {
    points
        .iter()
        .map(|c| Correspondence::new(first.forward(c.src), second.forward(c.dst)))
        .collect()
}

fn missing_detection(link: &PairLink) -> StitchError {
    StitchError::InvalidInput(format!(
        "pair {}->{} requests feature detection but no detection config was given",
        link.first, link.second
    ))
}

/// Features of every image taking part in a detected pair.
fn describe_detected(
    pairs: &[PairLink],
    layers: &[Layer],
    config: Option<&DetectionConfig>,
    trace: &mut StitchTrace,
) -> Result<Vec<Option<FeatureSet>>> {
    let mut features: Vec<Option<FeatureSet>> = vec![None; layers.len()];
    for link in pairs.iter().filter(|p| p.source == PairSource::Detect) {
        let config = config.ok_or_else(|| missing_detection(link))?;
        for i in [link.first, link.second] {
            if features[i].is_some() {
                continue;
            }
            let start = Instant::now();
            let layer = &layers[i];
            let (set, mut stage) =
                detect_features(&layer.image.to_gray(), Some(&layer.mask), config)?;
            stage.image = i;
            trace.features.push(stage);
            trace.timings.record(format!("features:{i}"), start);
            features[i] = Some(set);
        }
    }
    Ok(features)
}
