//! Homography estimation from point correspondences.
//!
//! Both projective solvers fix `h33 = 1` and solve for the remaining eight
//! entries from the two linear equations each pair contributes:
//!
//! ```text
//! a·x + b·y + c − g·x·x' − h·y·x' = x'
//! d·x + e·y + f − g·x·y' − h·y·y' = y'
//! ```
//!
//! Points are Hartley-normalised first (centroid at the origin, mean distance
//! √2) so the thresholds below are scale independent.
use super::Homography;
use crate::error::{Result, StitchError};
use crate::types::Correspondence;

use nalgebra::{DMatrix, DVector, Matrix3, SMatrix, SVector};

/// Smallest/largest singular value ratio treated as rank deficient.
const RANK_EPS: f64 = 1e-10;
/// Twice the triangle area (in normalised units) below which three points
/// count as collinear.
const COLLINEAR_EPS: f64 = 1e-9;

/// Exact solve from exactly four correspondences.
pub fn solve_exact(correspondences: &[Correspondence]) -> Result<Homography> {
    if correspondences.len() != 4 {
        return Err(StitchError::InsufficientData {
            needed: 4,
            got: correspondences.len(),
            context: "exact homography",
        });
    }
    let (t_src, t_dst) = normalizers(correspondences)?;
    let src: Vec<[f64; 2]> = correspondences.iter().map(|c| t_src.apply(c.src)).collect();
    let dst: Vec<[f64; 2]> = correspondences.iter().map(|c| t_dst.apply(c.dst)).collect();
    if has_collinear_triple(&src) || has_collinear_triple(&dst) {
        return Err(StitchError::degenerate(
            "three of the four points are collinear",
        ));
    }

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (i, (s, d)) in src.iter().zip(&dst).enumerate() {
        let (r0, r1) = equation_rows(*s, *d);
        for k in 0..8 {
            a[(2 * i, k)] = r0[k];
            a[(2 * i + 1, k)] = r1[k];
        }
        b[2 * i] = d[0];
        b[2 * i + 1] = d[1];
    }
    let h = a
        .lu()
        .solve(&b)
        .ok_or_else(|| StitchError::degenerate("exact homography system is singular"))?;
    denormalize(h.as_slice(), &t_src, &t_dst)
}

/// Least-squares solve over four or more correspondences via SVD.
pub fn solve_least_squares(correspondences: &[Correspondence]) -> Result<Homography> {
    let n = correspondences.len();
    if n < 4 {
        return Err(StitchError::InsufficientData {
            needed: 4,
            got: n,
            context: "least-squares homography",
        });
    }
    let (t_src, t_dst) = normalizers(correspondences)?;

    let mut a = DMatrix::<f64>::zeros(2 * n, 8);
    let mut b = DVector::<f64>::zeros(2 * n);
    for (i, c) in correspondences.iter().enumerate() {
        let s = t_src.apply(c.src);
        let d = t_dst.apply(c.dst);
        let (r0, r1) = equation_rows(s, d);
        for k in 0..8 {
            a[(2 * i, k)] = r0[k];
            a[(2 * i + 1, k)] = r1[k];
        }
        b[2 * i] = d[0];
        b[2 * i + 1] = d[1];
    }

    let svd = a.svd(true, true);
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    if !(max_sv > 0.0) || min_sv / max_sv < RANK_EPS {
        return Err(StitchError::degenerate(format!(
            "least-squares system is rank deficient (σmin/σmax = {:.3e})",
            if max_sv > 0.0 { min_sv / max_sv } else { 0.0 }
        )));
    }
    let h = svd
        .solve(&b, 0.0)
        .map_err(|e| StitchError::degenerate(format!("svd solve failed: {e}")))?;
    denormalize(h.as_slice(), &t_src, &t_dst)
}

/// Translation-only fit: the mean displacement of the pairs.
pub fn solve_translation(correspondences: &[Correspondence]) -> Result<Homography> {
    if correspondences.is_empty() {
        return Err(StitchError::InsufficientData {
            needed: 1,
            got: 0,
            context: "translation",
        });
    }
    let n = correspondences.len() as f64;
    let (sx, sy) = correspondences.iter().fold((0.0, 0.0), |(sx, sy), c| {
        (sx + c.dst[0] - c.src[0], sy + c.dst[1] - c.src[1])
    });
    let (tx, ty) = (sx / n, sy / n);
    if !(tx.is_finite() && ty.is_finite()) {
        return Err(StitchError::InvalidInput(
            "correspondences contain non-finite coordinates".into(),
        ));
    }
    Ok(Homography::translation(tx, ty))
}

fn equation_rows(s: [f64; 2], d: [f64; 2]) -> ([f64; 8], [f64; 8]) {
    let [x, y] = s;
    let [xp, yp] = d;
    (
        [x, y, 1.0, 0.0, 0.0, 0.0, -x * xp, -y * xp],
        [0.0, 0.0, 0.0, x, y, 1.0, -x * yp, -y * yp],
    )
}

/// Similarity `p ↦ s·(p − c)`.
#[derive(Clone, Copy, Debug)]
struct Normalizer {
    cx: f64,
    cy: f64,
    s: f64,
}

impl Normalizer {
    fn fit(points: impl Iterator<Item = [f64; 2]> + Clone) -> Result<Self> {
        let mut n = 0usize;
        let (mut cx, mut cy) = (0.0, 0.0);
        for p in points.clone() {
            if !(p[0].is_finite() && p[1].is_finite()) {
                return Err(StitchError::InvalidInput(
                    "correspondences contain non-finite coordinates".into(),
                ));
            }
            cx += p[0];
            cy += p[1];
            n += 1;
        }
        cx /= n as f64;
        cy /= n as f64;
        let mean_dist = points
            .map(|p| (p[0] - cx).hypot(p[1] - cy))
            .sum::<f64>()
            / n as f64;
        if !(mean_dist > f64::EPSILON) {
            return Err(StitchError::degenerate("all points coincide"));
        }
        Ok(Self {
            cx,
            cy,
            s: std::f64::consts::SQRT_2 / mean_dist,
        })
    }

    #[inline]
    fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [self.s * (p[0] - self.cx), self.s * (p[1] - self.cy)]
    }

    fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.s,
            0.0,
            -self.s * self.cx,
            0.0,
            self.s,
            -self.s * self.cy,
            0.0,
            0.0,
            1.0,
        )
    }

    fn inverse_matrix(&self) -> Matrix3<f64> {
        let inv = 1.0 / self.s;
        Matrix3::new(inv, 0.0, self.cx, 0.0, inv, self.cy, 0.0, 0.0, 1.0)
    }
}

fn normalizers(correspondences: &[Correspondence]) -> Result<(Normalizer, Normalizer)> {
    let t_src = Normalizer::fit(correspondences.iter().map(|c| c.src))?;
    let t_dst = Normalizer::fit(correspondences.iter().map(|c| c.dst))?;
    Ok((t_src, t_dst))
}

fn denormalize(h: &[f64], t_src: &Normalizer, t_dst: &Normalizer) -> Result<Homography> {
    let hn = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
    Homography::from_matrix(t_dst.inverse_matrix() * hn * t_src.matrix())
}

fn has_collinear_triple(points: &[[f64; 2]]) -> bool {
    let n = points.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                let (a, b, c) = (points[i], points[j], points[k]);
                let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
                if cross.abs() < COLLINEAR_EPS {
                    return true;
                }
            }
        }
    }
    false
}
