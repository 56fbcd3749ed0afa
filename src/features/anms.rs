//! Adaptive non-maximal suppression.
//!
//! A candidate's suppression radius is its distance (in level-0 pixels) to
//! the nearest candidate that is sufficiently stronger, `R_i < c·R_j`. Sorted
//! by decreasing response, the candidates able to suppress `i` form a prefix
//! of the ranking, so each radius is a single nearest-neighbour query in the
//! rank-limited k-d tree.
use super::spatial::KdTree;
use crate::types::Keypoint;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Keypoint with its suppression radius (level-0 pixels, infinite for the
/// strongest candidates).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankedKeypoint {
    pub keypoint: Keypoint,
    pub radius: f32,
}

/// Suppression radius of every candidate, returned in decreasing-response
/// order (ties keep input order).
pub fn suppression_radii(candidates: &[Keypoint], c_robust: f32) -> Vec<RankedKeypoint> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by(|a, b| b.response.total_cmp(&a.response));

    let points: Vec<[f32; 2]> = sorted
        .iter()
        .map(|k| {
            let [x, y] = k.position_l0();
            [x as f32, y as f32]
        })
        .collect();
    let tree = KdTree::build(points);
    let responses: Vec<f32> = sorted.iter().map(|k| k.response).collect();

    let radius_of = |i: usize| -> f32 {
        let r_i = responses[i];
        let prefix = responses.partition_point(|&r_j| c_robust * r_j > r_i);
        tree.nearest_below(tree.point(i), 1, prefix)
            .first()
            .map_or(f32::INFINITY, |n| n.dist_sq.sqrt())
    };

    #[cfg(feature = "parallel")]
    let radii: Vec<f32> = (0..sorted.len()).into_par_iter().map(radius_of).collect();
    #[cfg(not(feature = "parallel"))]
    let radii: Vec<f32> = (0..sorted.len()).map(radius_of).collect();

    sorted
        .into_iter()
        .zip(radii)
        .map(|(keypoint, radius)| RankedKeypoint { keypoint, radius })
        .collect()
}

/// Keep the `count` candidates with the largest suppression radius, sorted
/// by non-increasing radius.
pub fn anms(candidates: &[Keypoint], count: usize, c_robust: f32) -> Vec<RankedKeypoint> {
    let mut ranked = suppression_radii(candidates, c_robust);
    // stable: equal radii stay in response order
    ranked.sort_by(|a, b| b.radius.total_cmp(&a.radius));
    ranked.truncate(count);
    log::debug!(
        "anms candidates={} kept={} c_robust={}",
        candidates.len(),
        ranked.len(),
        c_robust
    );
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(x: f32, y: f32, response: f32) -> Keypoint {
        Keypoint {
            x,
            y,
            level: 0,
            response,
            orientation: 0.0,
        }
    }

    fn brute_radius(all: &[Keypoint], i: usize, c: f32) -> f32 {
        all.iter()
            .filter(|k| all[i].response < c * k.response)
            .map(|k| {
                let a = all[i].position_l0();
                let b = k.position_l0();
                ((a[0] - b[0]).hypot(a[1] - b[1])) as f32
            })
            .fold(f32::INFINITY, f32::min)
    }

    fn grid_candidates() -> Vec<Keypoint> {
        (0..120)
            .map(|i| {
                let x = ((i * 37) % 97) as f32;
                let y = ((i * 53) % 89) as f32;
                kp(x, y, 1.0 + ((i * 7919) % 113) as f32)
            })
            .collect()
    }

    #[test]
    fn radii_match_brute_force() {
        let cands = grid_candidates();
        let ranked = suppression_radii(&cands, 0.9);
        for r in &ranked {
            let i = cands.iter().position(|k| k == &r.keypoint).unwrap();
            let expected = brute_radius(&cands, i, 0.9);
            assert!(
                (r.radius - expected).abs() < 1e-3 || (r.radius.is_infinite() && expected.is_infinite()),
                "radius {} vs brute {}",
                r.radius,
                expected
            );
        }
    }

    #[test]
    fn output_is_capped_and_sorted_by_radius() {
        let cands = grid_candidates();
        let kept = anms(&cands, 25, 0.9);
        assert_eq!(kept.len(), 25);
        assert!(kept.windows(2).all(|w| w[0].radius >= w[1].radius));
        assert!(kept[0].radius.is_infinite());
    }

    #[test]
    fn levels_are_compared_in_full_resolution() {
        let mut coarse = kp(5.0, 5.0, 10.0);
        coarse.level = 1;
        let cands = vec![coarse, kp(13.0, 10.0, 1.0)];
        let ranked = suppression_radii(&cands, 0.9);
        assert!((ranked[1].radius - 3.0).abs() < 1e-5);
    }
}
