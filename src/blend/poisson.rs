//! Gradient-domain blending.
//!
//! Pixels covered by both layers are unknowns. For each unknown `p` and each
//! 4-neighbour `q` on the canvas and covered by some layer, the equation
//! `Σ (f_p − f_q) + λ·f_p = Σ g_pq + λ·t_p` is assembled, where `g_pq` is the
//! stronger of the two layers' gradients across the edge (mixed gradients),
//! `t_p` is the distance-weighted average of the two layers, and neighbours
//! covered by a single layer enter as fixed values (Dirichlet). Neighbours
//! off the canvas or uncovered are dropped (Neumann). The small Tikhonov term
//! `λ` keeps the system positive definite; it is solved per channel with
//! conjugate gradients on a CSR matrix.
use super::canvas::{Canvas, Composite};
use super::distance::DistanceField;
use super::two_band::low_band_weights;
use crate::error::{Result, StitchError};
use crate::image::ImageF32;
use crate::warp::Layer;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GradientDomainOptions {
    pub max_iterations: usize,
    /// Relative residual `‖b − Ax‖ / ‖b‖` at which CG stops.
    pub tolerance: f64,
    /// Weight of the pull towards the distance-weighted average.
    pub regularization: f64,
}

impl Default for GradientDomainOptions {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-6,
            regularization: 1e-3,
        }
    }
}

impl GradientDomainOptions {
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverReport {
    pub unknowns: usize,
    pub nonzeros: usize,
    /// Largest iteration count over channels.
    pub iterations: usize,
    /// Largest final relative residual over channels.
    pub residual: f64,
    pub converged: bool,
}

/// Compressed sparse row matrix.
#[derive(Clone, Debug, Default)]
pub struct CsrMatrix {
    row_ptr: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
}

impl CsrMatrix {
    fn with_rows(rows: usize) -> Self {
        let mut row_ptr = Vec::with_capacity(rows + 1);
        row_ptr.push(0);
        Self {
            row_ptr,
            cols: Vec::with_capacity(rows * 5),
            vals: Vec::with_capacity(rows * 5),
        }
    }

    fn push(&mut self, col: usize, val: f64) {
        self.cols.push(col);
        self.vals.push(val);
    }

    fn end_row(&mut self) {
        self.row_ptr.push(self.cols.len());
    }

    pub fn rows(&self) -> usize {
        self.row_ptr.len().saturating_sub(1)
    }

    pub fn nonzeros(&self) -> usize {
        self.vals.len()
    }

    /// `y = A·x`
    pub fn mul_into(&self, x: &[f64], y: &mut [f64]) {
        for (r, out) in y.iter_mut().enumerate() {
            let (s, e) = (self.row_ptr[r], self.row_ptr[r + 1]);
            *out = self.cols[s..e]
                .iter()
                .zip(&self.vals[s..e])
                .map(|(&c, &v)| v * x[c])
                .sum();
        }
    }
}

/// Solve `A·x = b` for symmetric positive definite `A`, starting from `x`.
/// Returns the iteration count and the final relative residual.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &[f64],
    x: &mut [f64],
    max_iterations: usize,
    tolerance: f64,
) -> (usize, f64) {
    let n = b.len();
    let b_norm = dot(b, b).sqrt().max(f64::MIN_POSITIVE);
    let mut ap = vec![0.0; n];
    a.mul_into(x, &mut ap);
    let mut r: Vec<f64> = b.iter().zip(&ap).map(|(bi, ai)| bi - ai).collect();
    let mut p = r.clone();
    let mut rs = dot(&r, &r);
    if rs.sqrt() <= tolerance * b_norm {
        return (0, rs.sqrt() / b_norm);
    }
    for it in 1..=max_iterations {
        a.mul_into(&p, &mut ap);
        let pap = dot(&p, &ap);
        if pap <= 0.0 {
            return (it, rs.sqrt() / b_norm);
        }
        let alpha = rs / pap;
        for i in 0..n {
            x[i] += alpha * p[i];
            r[i] -= alpha * ap[i];
        }
        let rs_new = dot(&r, &r);
        if rs_new.sqrt() <= tolerance * b_norm {
            return (it, rs_new.sqrt() / b_norm);
        }
        let beta = rs_new / rs;
        for (pi, ri) in p.iter_mut().zip(&r) {
            *pi = ri + beta * *pi;
        }
        rs = rs_new;
    }
    (max_iterations, rs.sqrt() / b_norm)
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

const NONE: usize = usize::MAX;

/// Linear system shared by all channels plus per-channel right-hand sides
/// and initial guesses.
struct System {
    matrix: CsrMatrix,
    /// Canvas pixel index of each unknown.
    pixels: Vec<usize>,
    rhs: Vec<Vec<f64>>,
    guess: Vec<Vec<f64>>,
}

fn assemble(
    base: &Layer,
    incoming: &Layer,
    d_base: &DistanceField,
    d_incoming: &DistanceField,
    lambda: f64,
) -> System {
    let (w, h) = (base.bounds.width, base.bounds.height);
    let channels = base.channels();
    let in_a = |i: usize| base.mask.data[i] > 0.5;
    let in_b = |i: usize| incoming.mask.data[i] > 0.5;

    let mut index = vec![NONE; w * h];
    let mut pixels = Vec::new();
    for i in 0..w * h {
        if in_a(i) && in_b(i) {
            index[i] = pixels.len();
            pixels.push(i);
        }
    }

    let n = pixels.len();
    let mut matrix = CsrMatrix::with_rows(n);
    let mut rhs = vec![vec![0.0f64; n]; channels];
    let mut guess = vec![vec![0.0f64; n]; channels];
    let planes_a: Vec<&[f32]> = base.image.planes().iter().map(|p| p.data.as_slice()).collect();
    let planes_b: Vec<&[f32]> = incoming.image.planes().iter().map(|p| p.data.as_slice()).collect();

    for (row, &p) in pixels.iter().enumerate() {
        let (x, y) = (p % w, p / w);
        let mut neighbours = [NONE; 4];
        if x > 0 {
            neighbours[0] = p - 1;
        }
        if x + 1 < w {
            neighbours[1] = p + 1;
        }
        if y > 0 {
            neighbours[2] = p - w;
        }
        if y + 1 < h {
            neighbours[3] = p + w;
        }

        let (wa, wb) = low_band_weights(d_base.data[p], d_incoming.data[p]);
        for c in 0..channels {
            let t = (wa * planes_a[c][p] + wb * planes_b[c][p]) as f64;
            rhs[c][row] = lambda * t;
            guess[c][row] = t;
        }

        let mut degree = 0.0f64;
        let mut off_diag = Vec::with_capacity(4);
        for &q in neighbours.iter().filter(|&&q| q != NONE) {
            let (qa, qb) = (in_a(q), in_b(q));
            if !qa && !qb {
                continue;
            }
            degree += 1.0;
            for c in 0..channels {
                let ga = qa.then(|| (planes_a[c][p] - planes_a[c][q]) as f64);
                let gb = qb.then(|| (planes_b[c][p] - planes_b[c][q]) as f64);
                let g = match (ga, gb) {
                    (Some(a), Some(b)) => {
                        if b.abs() > a.abs() {
                            b
                        } else {
                            a
                        }
                    }
                    (Some(a), None) => a,
                    (None, Some(b)) => b,
                    (None, None) => 0.0,
                };
                rhs[c][row] += g;
                if index[q] == NONE {
                    let fixed = if qa { planes_a[c][q] } else { planes_b[c][q] };
                    rhs[c][row] += fixed as f64;
                }
            }
            if index[q] != NONE {
                off_diag.push(index[q]);
            }
        }

        off_diag.sort_unstable();
        let mut diag_written = false;
        for col in off_diag {
            if !diag_written && col > row {
                matrix.push(row, degree + lambda);
                diag_written = true;
            }
            matrix.push(col, -1.0);
        }
        if !diag_written {
            matrix.push(row, degree + lambda);
        }
        matrix.end_row();
    }

    System {
        matrix,
        pixels,
        rhs,
        guess,
    }
}

/// Blend `incoming` over `base` in the gradient domain.
pub fn gradient_domain_blend(
    base: &Layer,
    incoming: &Layer,
    d_base: &DistanceField,
    d_incoming: &DistanceField,
    options: &GradientDomainOptions,
) -> Result<(Composite, SolverReport)> {
    if base.bounds != incoming.bounds || base.channels() != incoming.channels() {
        return Err(StitchError::InvalidInput(format!(
            "cannot blend {:?}x{} with {:?}x{}",
            base.bounds,
            base.channels(),
            incoming.bounds,
            incoming.channels()
        )));
    }
    if !(options.regularization > 0.0 && options.tolerance > 0.0) {
        return Err(StitchError::InvalidInput(format!(
            "gradient-domain regularization {} and tolerance {} must be positive",
            options.regularization, options.tolerance
        )));
    }
    let (w, h) = (base.bounds.width, base.bounds.height);
    let system = assemble(base, incoming, d_base, d_incoming, options.regularization);
    log::debug!(
        "gradient_domain_blend w={} h={} unknowns={} nnz={}",
        w,
        h,
        system.pixels.len(),
        system.matrix.nonzeros()
    );

    let solve = |c: usize| -> (Vec<f64>, usize, f64) {
        let mut x = system.guess[c].clone();
        let (iters, residual) = conjugate_gradient(
            &system.matrix,
            &system.rhs[c],
            &mut x,
            options.max_iterations,
            options.tolerance,
        );
        (x, iters, residual)
    };
    let channels = base.channels();
    #[cfg(feature = "parallel")]
    let solutions: Vec<(Vec<f64>, usize, f64)> = (0..channels).into_par_iter().map(solve).collect();
    #[cfg(not(feature = "parallel"))]
    let solutions: Vec<(Vec<f64>, usize, f64)> = (0..channels).map(solve).collect();

    let mut report = SolverReport {
        unknowns: system.pixels.len(),
        nonzeros: system.matrix.nonzeros(),
        converged: true,
        ..SolverReport::default()
    };
    for (_, iters, residual) in &solutions {
        report.iterations = report.iterations.max(*iters);
        report.residual = report.residual.max(*residual);
        report.converged &= *residual <= options.tolerance;
    }
    if !report.converged {
        log::warn!(
            "conjugate gradient stopped at residual {:.3e} after {} iterations",
            report.residual,
            report.iterations
        );
    }

    let mut covered = ImageF32::new(w, h);
    for (i, m) in covered.data.iter_mut().enumerate() {
        if base.mask.data[i] > 0.5 || incoming.mask.data[i] > 0.5 {
            *m = 1.0;
        }
    }
    let mut canvas = Canvas::new(base.bounds, channels);
    for c in 0..channels {
        let (pa, pb) = (&base.image.plane(c).data, &incoming.image.plane(c).data);
        let mut plane = ImageF32::new(w, h);
        for (i, v) in plane.data.iter_mut().enumerate() {
            if base.mask.data[i] > 0.5 {
                *v = pa[i];
            } else if incoming.mask.data[i] > 0.5 {
                *v = pb[i];
            }
        }
        if let Some((x, _, _)) = solutions.get(c) {
            for (&p, &val) in system.pixels.iter().zip(x) {
                plane.data[p] = val as f32;
            }
        }
        canvas.put_plane(c, plane, &covered);
    }
    Ok((canvas.finalize(), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blend::distance_transform;
    use crate::image::Image;
    use crate::warp::CanvasBounds;

    fn strip(value: impl Fn(usize, usize) -> f32, from: usize, to: usize) -> Layer {
        let in_strip = |x: usize| (from..to).contains(&x);
        Layer {
            bounds: CanvasBounds::of_image(24, 8),
            image: Image::from_plane(ImageF32::from_fn(24, 8, |x, y| {
                if in_strip(x) { value(x, y) } else { 0.0 }
            })),
            mask: ImageF32::from_fn(24, 8, |x, _| if in_strip(x) { 1.0 } else { 0.0 }),
        }
    }

    #[test]
    fn cg_solves_small_spd_system() {
        // [[4, -1], [-1, 3]] x = [1, 2]
        let mut a = CsrMatrix::with_rows(2);
        a.push(0, 4.0);
        a.push(1, -1.0);
        a.end_row();
        a.push(0, -1.0);
        a.push(1, 3.0);
        a.end_row();
        let mut x = vec![0.0; 2];
        let (iters, res) = conjugate_gradient(&a, &[1.0, 2.0], &mut x, 10, 1e-12);
        assert!(iters <= 2);
        assert!(res <= 1e-12);
        assert!((x[0] - 5.0 / 11.0).abs() < 1e-12);
        assert!((x[1] - 9.0 / 11.0).abs() < 1e-12);
    }

    #[test]
    fn identical_layers_are_a_fixed_point() {
        let f = |x: usize, y: usize| ((x * 3 + y * 5) % 9) as f32 / 9.0;
        let layer = strip(f, 0, 24);
        let d = distance_transform(&layer.mask);
        let (out, report) =
            gradient_domain_blend(&layer, &layer, &d, &d, &GradientDomainOptions::default())
                .unwrap();
        assert!(report.converged);
        assert_eq!(report.unknowns, 24 * 8);
        for (a, b) in out.image.plane(0).data.iter().zip(&layer.image.plane(0).data) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn offset_seam_is_absorbed_by_the_overlap() {
        let a = strip(|_, _| 0.3, 0, 16);
        let b = strip(|_, _| 0.6, 8, 24);
        let (da, db) = (distance_transform(&a.mask), distance_transform(&b.mask));
        let (out, report) =
            gradient_domain_blend(&a, &b, &da, &db, &GradientDomainOptions::default()).unwrap();
        assert!(report.converged);
        assert_eq!(out.covered_pixels(), 24 * 8);
        assert_eq!(out.image.get(2, 4, 0), 0.3);
        assert_eq!(out.image.get(20, 4, 0), 0.6);
        let mut prev = 0.3 - 1e-4;
        for x in 8..16 {
            let v = out.image.get(x, 4, 0);
            assert!((0.3 - 1e-3..=0.6 + 1e-3).contains(&v), "x={x} v={v}");
            assert!(v >= prev - 1e-4);
            prev = v;
        }
    }

    #[test]
    fn disjoint_layers_need_no_solve() {
        let a = strip(|_, _| 0.3, 0, 10);
        let b = strip(|_, _| 0.6, 12, 24);
        let (da, db) = (distance_transform(&a.mask), distance_transform(&b.mask));
        let (out, report) =
            gradient_domain_blend(&a, &b, &da, &db, &GradientDomainOptions::default()).unwrap();
        assert_eq!(report.unknowns, 0);
        assert!(!out.to_layer().covered(11, 3));
        assert_eq!(out.image.get(15, 3, 0), 0.6);
    }
}
