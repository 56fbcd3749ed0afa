//! Static k-d tree over a fixed point array.
//!
//! The tree is implicit: `order` is a permutation of point indices where the
//! node for the index range `[lo, hi)` sits at `mid = (lo + hi) / 2`, its left
//! subtree is `[lo, mid)` and its right subtree `[mid + 1, hi)`. Nodes are
//! addressed by position, never by pointer.
//!
//! Every node also records the smallest point index in its subtree, so a
//! query can be restricted to points with index below a limit and skip whole
//! subtrees that hold none. ANMS relies on this: candidates are indexed by
//! response rank, and only a prefix of the ranking can suppress a point.

/// A query hit: point index and squared distance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub dist_sq: f32,
}

#[derive(Clone, Debug)]
pub struct KdTree<const D: usize> {
    points: Vec<[f32; D]>,
    order: Vec<usize>,
    split_dim: Vec<u8>,
    min_index: Vec<usize>,
}

impl<const D: usize> KdTree<D> {
    pub fn build(points: Vec<[f32; D]>) -> Self {
        let n = points.len();
        let mut tree = Self {
            order: (0..n).collect(),
            split_dim: vec![0; n],
            min_index: vec![usize::MAX; n],
            points,
        };
        tree.build_range(0, n);
        tree
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, index: usize) -> &[f32; D] {
        &self.points[index]
    }

    /// Returns the smallest index in `[lo, hi)` after laying out the subtree.
    fn build_range(&mut self, lo: usize, hi: usize) -> usize {
        if lo >= hi {
            return usize::MAX;
        }
        let mid = (lo + hi) / 2;
        let dim = self.widest_dim(lo, hi);
        let points = &self.points;
        self.order[lo..hi].select_nth_unstable_by(mid - lo, |&a, &b| {
            points[a][dim].total_cmp(&points[b][dim]).then(a.cmp(&b))
        });
        self.split_dim[mid] = dim as u8;
        let left = self.build_range(lo, mid);
        let right = self.build_range(mid + 1, hi);
        let min = self.order[mid].min(left).min(right);
        self.min_index[mid] = min;
        min
    }

    fn widest_dim(&self, lo: usize, hi: usize) -> usize {
        let mut best = (0usize, f32::NEG_INFINITY);
        for dim in 0..D {
            let (mut min, mut max) = (f32::INFINITY, f32::NEG_INFINITY);
            for &i in &self.order[lo..hi] {
                let v = self.points[i][dim];
                min = min.min(v);
                max = max.max(v);
            }
            if max - min > best.1 {
                best = (dim, max - min);
            }
        }
        best.0
    }

    /// `k` nearest points to `query`, closest first.
    pub fn nearest(&self, query: &[f32; D], k: usize) -> Vec<Neighbor> {
        self.nearest_below(query, k, usize::MAX)
    }

    /// `k` nearest points among those with index `< limit`, closest first.
    /// Equal distances are ordered by index.
    pub fn nearest_below(&self, query: &[f32; D], k: usize, limit: usize) -> Vec<Neighbor> {
        let mut best = Vec::with_capacity(k + 1);
        if k > 0 {
            self.search(0, self.points.len(), query, k, limit, &mut best);
        }
        best
    }

    fn search(
        &self,
        lo: usize,
        hi: usize,
        query: &[f32; D],
        k: usize,
        limit: usize,
        best: &mut Vec<Neighbor>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = (lo + hi) / 2;
        if self.min_index[mid] >= limit {
            return;
        }
        let index = self.order[mid];
        let p = &self.points[index];
        if index < limit {
            let dist_sq = squared_distance(query, p);
            insert_bounded(best, Neighbor { index, dist_sq }, k);
        }
        let dim = self.split_dim[mid] as usize;
        let diff = query[dim] - p[dim];
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };
        self.search(near.0, near.1, query, k, limit, best);
        let worst = if best.len() < k {
            f32::INFINITY
        } else {
            best[k - 1].dist_sq
        };
        if diff * diff <= worst {
            self.search(far.0, far.1, query, k, limit, best);
        }
    }
}

#[inline]
pub fn squared_distance<const D: usize>(a: &[f32; D], b: &[f32; D]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn insert_bounded(best: &mut Vec<Neighbor>, cand: Neighbor, k: usize) {
    let pos = best.partition_point(|n| {
        n.dist_sq < cand.dist_sq || (n.dist_sq == cand.dist_sq && n.index < cand.index)
    });
    if pos >= k {
        return;
    }
    best.insert(pos, cand);
    best.truncate(k);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute(points: &[[f32; 2]], q: &[f32; 2], k: usize, limit: usize) -> Vec<usize> {
        let mut all: Vec<(f32, usize)> = points
            .iter()
            .enumerate()
            .filter(|(i, _)| *i < limit)
            .map(|(i, p)| (squared_distance(q, p), i))
            .collect();
        all.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        all.into_iter().take(k).map(|(_, i)| i).collect()
    }

    fn scattered(n: usize) -> Vec<[f32; 2]> {
        (0..n)
            .map(|i| {
                let t = i as f32;
                [(t * 37.3) % 101.0, (t * 59.1) % 83.0]
            })
            .collect()
    }

    #[test]
    fn matches_brute_force() {
        let pts = scattered(200);
        let tree = KdTree::build(pts.clone());
        for q in [[3.0, 4.0], [50.0, 50.0], [100.0, 0.0], [-10.0, 90.0]] {
            let got: Vec<usize> = tree.nearest(&q, 3).iter().map(|n| n.index).collect();
            assert_eq!(got, brute(&pts, &q, 3, usize::MAX));
        }
    }

    #[test]
    fn index_limit_restricts_candidates() {
        let pts = scattered(150);
        let tree = KdTree::build(pts.clone());
        for limit in [0, 1, 7, 60, 149] {
            let q = [20.0, 30.0];
            let got: Vec<usize> = tree
                .nearest_below(&q, 2, limit)
                .iter()
                .map(|n| n.index)
                .collect();
            assert_eq!(got, brute(&pts, &q, 2, limit));
        }
    }

    #[test]
    fn empty_tree_returns_nothing() {
        let tree: KdTree<3> = KdTree::build(Vec::new());
        assert!(tree.nearest(&[0.0; 3], 2).is_empty());
    }
}
