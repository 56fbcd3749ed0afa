//! Planar projective geometry: the [`Homography`] type and its solvers.

pub mod homography;
pub mod solve;

pub use homography::{transfer_error, Homography};
pub use solve::{solve_exact, solve_least_squares, solve_translation};
