//! Image gradients (Sobel/Scharr) with clamped borders.
//!
//! - Convolves a 3×3 kernel pair (`X` and `Y`) with border clamping.
//! - Outputs per-pixel `gx`, `gy` normalised by the kernel weight, so a unit
//!   intensity ramp yields a derivative of 1 regardless of the kernel.
//!
//! Complexity: O(W·H) per pass; memory: two float buffers.
use crate::image::{ImageF32, ImageView, ImageViewMut};

use serde::{Deserialize, Serialize};

type Kernel3 = [[f32; 3]; 3];

const SOBEL_KERNEL_X: Kernel3 = [[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]];
const SOBEL_KERNEL_Y: Kernel3 = [[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]];

const SCHARR_KERNEL_X: Kernel3 = [[-3.0, 0.0, 3.0], [-10.0, 0.0, 10.0], [-3.0, 0.0, 3.0]];
const SCHARR_KERNEL_Y: Kernel3 = [[-3.0, -10.0, -3.0], [0.0, 0.0, 0.0], [3.0, 10.0, 3.0]];

/// Derivative kernel family.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientKernel {
    #[default]
    Sobel,
    /// Better rotational symmetry than Sobel.
    Scharr,
}

impl GradientKernel {
    fn kernels(self) -> (&'static Kernel3, &'static Kernel3, f32) {
        match self {
            GradientKernel::Sobel => (&SOBEL_KERNEL_X, &SOBEL_KERNEL_Y, 1.0 / 8.0),
            GradientKernel::Scharr => (&SCHARR_KERNEL_X, &SCHARR_KERNEL_Y, 1.0 / 32.0),
        }
    }
}

/// Per-pixel derivative buffers.
#[derive(Clone, Debug)]
pub struct Grad {
    /// Horizontal derivative (intensity units per pixel)
    pub gx: ImageF32,
    /// Vertical derivative (intensity units per pixel)
    pub gy: ImageF32,
}

impl Grad {
    /// Gradient at (x, y) as `(gx, gy)`.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> (f32, f32) {
        (self.gx.get(x, y), self.gy.get(x, y))
    }
}

/// Compute gradients of `l` with the chosen kernel.
pub fn image_gradients(l: &ImageF32, kernel: GradientKernel) -> Grad {
    let (kernel_x, kernel_y, norm) = kernel.kernels();
    let (w, h) = (l.w, l.h);
    let mut gx = ImageF32::new(w, h);
    let mut gy = ImageF32::new(w, h);
    if l.is_empty() {
        return Grad { gx, gy };
    }

    for y in 0..h {
        let y_idx = [y.saturating_sub(1), y, (y + 1).min(h - 1)];
        let rows = [l.row(y_idx[0]), l.row(y_idx[1]), l.row(y_idx[2])];
        let out_gx = gx.row_mut(y);
        let out_gy = gy.row_mut(y);
        for x in 0..w {
            let x_idx = [x.saturating_sub(1), x, (x + 1).min(w - 1)];

            let mut sum_x = 0.0;
            let mut sum_y = 0.0;
            for (ky, yy_row) in rows.iter().enumerate() {
                let kx_row = &kernel_x[ky];
                let ky_row = &kernel_y[ky];
                for k in 0..3 {
                    let v = yy_row[x_idx[k]];
                    sum_x += v * kx_row[k];
                    sum_y += v * ky_row[k];
                }
            }
            out_gx[x] = sum_x * norm;
            out_gy[x] = sum_y * norm;
        }
    }

    Grad { gx, gy }
}

/// Compute Sobel gradients on a single-channel float image.
pub fn sobel_gradients(l: &ImageF32) -> Grad {
    image_gradients(l, GradientKernel::Sobel)
}
