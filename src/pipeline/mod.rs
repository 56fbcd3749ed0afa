//! Stitching pipeline: pairwise estimation, chaining and the composition
//! fold.
//!
//! Overview
//! - Every [`PairLink`] yields `H_first→second`, from manual correspondences
//!   (direct solve or RANSAC) or from detected and matched features.
//! - The pair graph must connect all images. Its centre (the image with the
//!   smallest maximum hop count, lowest index on ties) becomes the
//!   composition surface, and every other image is chained to it along
//!   breadth-first parents, inverting edges traversed backwards.
//! - The composite is seeded with the reference and then grows one image at
//!   a time: union bounds, pad, warp, optional exposure compensation, blend
//!   into a fresh canvas, finalize. The fold is a plain loop over an explicit
//!   order.
//! - On a cylindrical surface every image is reprojected first, manual
//!   points are mapped through the same projection and pairs are fitted with
//!   the translation model.
//!
//! Modules
//! - [`options`]: surfaces, pair links and [`StitchOptions`].
//! - [`graph`]: connectivity, reference selection and composition order.
//! - [`estimate`]: per-pair transform estimation.
//! - `fold`: the iterative composition.
//! - `stitcher`: the [`Stitcher`] entry point.

pub mod estimate;
mod fold;
pub mod graph;
pub mod options;
mod stitcher;

pub use estimate::{estimate_detected, estimate_manual, PairEstimate};
pub use fold::fold_layers;
pub use graph::{composition_order, BfsTree, PairGraph};
pub use options::{PairLink, PairSource, StitchOptions, Surface};
pub use stitcher::{stitch, StitchOutput, Stitcher};
