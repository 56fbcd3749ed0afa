use crate::error::{Result, StitchError};
use crate::types::Correspondence;

use nalgebra::{Matrix3, Vector3};
use serde::Serialize;

/// Homogeneous divisor below which a projection is treated as a point at
/// infinity.
const W_EPS: f64 = 1e-12;
/// Lower bound on `|det(H)| / ‖H‖_F³`.
const DEGENERACY_EPS: f64 = 1e-12;

/// Planar projective transform, stored normalised (`H[2,2] = 1` when
/// possible, unit Frobenius norm otherwise). Always invertible.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Homography(Matrix3<f64>);

impl Homography {
    /// Normalise `m` and check it is invertible.
    pub fn from_matrix(m: Matrix3<f64>) -> Result<Self> {
        if m.iter().any(|v| !v.is_finite()) {
            return Err(StitchError::degenerate("homography has non-finite entries"));
        }
        let norm = m.norm();
        if norm <= f64::MIN_POSITIVE {
            return Err(StitchError::degenerate("homography is the zero matrix"));
        }
        let h22 = m[(2, 2)];
        let normalized = if h22.abs() > W_EPS * norm {
            m / h22
        } else {
            m / norm
        };
        let ratio = degeneracy_ratio(&normalized);
        if ratio < DEGENERACY_EPS {
            return Err(StitchError::degenerate(format!(
                "homography is singular (|det|/|H|^3 = {ratio:.3e})"
            )));
        }
        Ok(Self(normalized))
    }

    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Pure translation by `(tx, ty)`.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self(Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0))
    }

    #[inline]
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    /// Row-major entries, convenient for reports.
    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.0;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    /// Map `p` through the transform; `None` if it lands at infinity.
    #[inline]
    pub fn apply(&self, p: [f64; 2]) -> Option<[f64; 2]> {
        let v = self.0 * Vector3::new(p[0], p[1], 1.0);
        let w = v[2];
        if !w.is_finite() || w.abs() <= W_EPS {
            return None;
        }
        let out = [v[0] / w, v[1] / w];
        (out[0].is_finite() && out[1].is_finite()).then_some(out)
    }

    /// `self · other`: applies `other` first, then `self`.
    pub fn compose(&self, other: &Homography) -> Result<Homography> {
        Homography::from_matrix(self.0 * other.0)
    }

    pub fn inverse(&self) -> Result<Homography> {
        let inv = self
            .0
            .try_inverse()
            .ok_or_else(|| StitchError::degenerate("homography is not invertible"))?;
        Homography::from_matrix(inv)
    }

    /// Largest absolute entry difference after normalisation.
    pub fn max_abs_diff(&self, other: &Homography) -> f64 {
        (self.0 - other.0).abs().max()
    }
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

fn degeneracy_ratio(m: &Matrix3<f64>) -> f64 {
    let norm = m.norm();
    m.determinant().abs() / (norm * norm * norm)
}

/// Distance between `H(c.src)` and `c.dst`; infinite when the projection is
/// undefined.
#[inline]
pub fn transfer_error(h: &Homography, c: &Correspondence) -> f64 {
    match h.apply(c.src) {
        Some(p) => (p[0] - c.dst[0]).hypot(p[1] - c.dst[1]),
        None => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Homography {
        Homography::from_matrix(Matrix3::new(
            1.1, 0.05, 3.0, -0.02, 0.95, -2.0, 1e-4, -2e-4, 1.0,
        ))
        .unwrap()
    }

    #[test]
    fn normalisation_fixes_scale() {
        let h = Homography::from_matrix(Matrix3::identity() * 4.0).unwrap();
        assert_eq!(h, Homography::identity());
    }

    #[test]
    fn singular_matrices_are_rejected() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0);
        assert!(matches!(
            Homography::from_matrix(m),
            Err(StitchError::DegenerateConfiguration { .. })
        ));
    }

    #[test]
    fn inverse_composes_to_identity() {
        let h = sample();
        let id = h.compose(&h.inverse().unwrap()).unwrap();
        assert!(id.max_abs_diff(&Homography::identity()) < 1e-10);
        let p = [12.0, -7.5];
        let back = h.inverse().unwrap().apply(h.apply(p).unwrap()).unwrap();
        assert!((back[0] - p[0]).abs() < 1e-9 && (back[1] - p[1]).abs() < 1e-9);
    }

    #[test]
    fn compose_applies_right_operand_first() {
        let t = Homography::translation(5.0, 0.0);
        let s = Homography::from_matrix(Matrix3::new(2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0))
            .unwrap();
        let p = s.compose(&t).unwrap().apply([1.0, 1.0]).unwrap();
        assert_eq!(p, [12.0, 2.0]);
    }

    #[test]
    fn points_at_infinity_have_no_image() {
        let h = Homography::from_matrix(Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0))
            .unwrap();
        assert!(h.apply([-1.0, 3.0]).is_none());
        let c = Correspondence::new([-1.0, 3.0], [0.0, 0.0]);
        assert!(transfer_error(&h, &c).is_infinite());
    }
}
