//! Gaussian pyramid with configurable separable blur and 2× decimation.
//!
//! Level 0 is the caller's luminance plane; each further level is blurred
//! with the static 5-tap kernel and subsampled by 2 with clamped borders.
//! The `filters` submodule also hosts the arbitrary-sigma Gaussian used by
//! the detector, descriptor and blender.

pub mod filters;
pub mod options;
pub mod pyramidbuild;

pub use filters::{
    convolve_separable, gaussian_blur, GaussianFilter, SeparableFilter, StaticSeparableFilter,
    GAUSSIAN_5TAP,
};
pub use options::PyramidOptions;
pub use pyramidbuild::{build_pyramid, level_scale, Pyramid, PyramidResult};
