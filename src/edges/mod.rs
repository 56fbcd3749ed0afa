//! Image derivatives used by the corner detector.
//!
//! Borders are handled by clamping indices (replicate).

pub mod grad;

pub use grad::{image_gradients, sobel_gradients, Grad, GradientKernel};
