//! Descriptor matching with Lowe's ratio test and a mutual-consistency
//! filter.
use super::spatial::KdTree;
use crate::error::{Result, StitchError};
use crate::types::{Correspondence, Descriptor, Keypoint, DESCRIPTOR_LEN};

use serde::Serialize;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Accepted match between descriptor `a` of the first set and `b` of the
/// second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FeatureMatch {
    pub a: usize,
    pub b: usize,
    /// L2 descriptor distance.
    pub distance: f32,
}

fn build_tree(set: &[Descriptor]) -> KdTree<DESCRIPTOR_LEN> {
    KdTree::build(set.iter().map(|d| d.0).collect())
}

/// For each query, its nearest neighbour in `tree` if it passes the ratio
/// test.
fn ratio_selections(
    queries: &[Descriptor],
    tree: &KdTree<DESCRIPTOR_LEN>,
    ratio: f32,
) -> Vec<Option<(usize, f32)>> {
    let select = |q: &Descriptor| -> Option<(usize, f32)> {
        let nn = tree.nearest(&q.0, 2);
        let first = nn.first()?;
        let d1 = first.dist_sq.sqrt();
        let accepted = match nn.get(1) {
            None => true,
            Some(second) => {
                let d2 = second.dist_sq.sqrt();
                d2 > 0.0 && d1 / d2 < ratio
            }
        };
        accepted.then_some((first.index, d1))
    };

    #[cfg(feature = "parallel")]
    {
        queries.par_iter().map(select).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        queries.iter().map(select).collect()
    }
}

/// Match descriptor sets `a` and `b`: ratio test in both directions, keeping
/// only pairs that select each other. Ordered by index in `a`.
pub fn match_descriptors(
    a: &[Descriptor],
    b: &[Descriptor],
    ratio_threshold: f32,
) -> Result<Vec<FeatureMatch>> {
    if !(ratio_threshold > 0.0 && ratio_threshold <= 1.0) {
        return Err(StitchError::InvalidInput(format!(
            "ratio_threshold must lie in (0, 1], got {ratio_threshold}"
        )));
    }
    if a.is_empty() || b.is_empty() {
        return Ok(Vec::new());
    }
    let forward = ratio_selections(a, &build_tree(b), ratio_threshold);
    let backward = ratio_selections(b, &build_tree(a), ratio_threshold);

    let matches: Vec<FeatureMatch> = forward
        .iter()
        .enumerate()
        .filter_map(|(ia, sel)| {
            let (ib, distance) = (*sel)?;
            let (back, _) = backward[ib]?;
            (back == ia).then_some(FeatureMatch {
                a: ia,
                b: ib,
                distance,
            })
        })
        .collect();
    log::debug!(
        "match_descriptors a={} b={} forward={} mutual={}",
        a.len(),
        b.len(),
        forward.iter().filter(|s| s.is_some()).count(),
        matches.len()
    );
    Ok(matches)
}

/// Level-0 point pairs for `matches` (`src` in the first image).
pub fn to_correspondences(
    matches: &[FeatureMatch],
    keypoints_a: &[Keypoint],
    keypoints_b: &[Keypoint],
) -> Vec<Correspondence> {
    matches
        .iter()
        .map(|m| {
            Correspondence::new(
                keypoints_a[m.a].position_l0(),
                keypoints_b[m.b].position_l0(),
            )
        })
        .collect()
}
