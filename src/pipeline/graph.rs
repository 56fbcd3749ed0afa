//! Pair graph: connectivity, reference selection and composition order.
use crate::error::{Result, StitchError};

use std::collections::VecDeque;

/// Undirected graph over image indices; edge `e` is the `e`-th pair link.
#[derive(Clone, Debug)]
pub struct PairGraph {
    /// `(neighbour, edge)` sorted by neighbour, then edge.
    adjacency: Vec<Vec<(usize, usize)>>,
}

/// Breadth-first tree rooted at one image.
#[derive(Clone, Debug)]
pub struct BfsTree {
    pub root: usize,
    /// Hop count from the root; `None` when unreachable.
    pub hops: Vec<Option<usize>>,
    /// `(parent, edge)` for every reached non-root image.
    pub parent: Vec<Option<(usize, usize)>>,
    /// Images in visiting order, root first.
    pub visit_order: Vec<usize>,
}

impl PairGraph {
    pub fn new(images: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut adjacency = vec![Vec::new(); images];
        for (e, &(a, b)) in edges.iter().enumerate() {
            if a >= images || b >= images || a == b {
                return Err(StitchError::InvalidInput(format!(
                    "pair {e} links images {a} and {b}; expected two distinct indices below {images}"
                )));
            }
            adjacency[a].push((b, e));
            adjacency[b].push((a, e));
        }
        for list in &mut adjacency {
            list.sort_unstable();
        }
        Ok(Self { adjacency })
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn bfs(&self, root: usize) -> BfsTree {
        let n = self.len();
        let mut hops = vec![None; n];
        let mut parent = vec![None; n];
        let mut visit_order = Vec::with_capacity(n);
        let mut queue = VecDeque::new();
        hops[root] = Some(0);
        queue.push_back(root);
        while let Some(i) = queue.pop_front() {
            visit_order.push(i);
            let d = hops[i].unwrap_or(0);
            for &(j, e) in &self.adjacency[i] {
                if hops[j].is_none() {
                    hops[j] = Some(d + 1);
                    parent[j] = Some((i, e));
                    queue.push_back(j);
                }
            }
        }
        BfsTree {
            root,
            hops,
            parent,
            visit_order,
        }
    }

    /// Fails with `InsufficientData` unless every image is reachable.
    pub fn ensure_connected(&self) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        let reached = self.bfs(0).visit_order.len();
        if reached < self.len() {
            return Err(StitchError::InsufficientData {
                needed: self.len(),
                got: reached,
                context: "images connected by the pair graph",
            });
        }
        Ok(())
    }

    /// Image minimising the maximum hop count to all others; ties go to
    /// the lowest index. The graph must be connected.
    pub fn centre(&self) -> usize {
        (0..self.len())
            .map(|i| {
                let ecc = self
                    .bfs(i)
                    .hops
                    .iter()
                    .map(|h| h.unwrap_or(usize::MAX))
                    .max()
                    .unwrap_or(0);
                (ecc, i)
            })
            .min()
            .map(|(_, i)| i)
            .unwrap_or(0)
    }
}

/// Composition order after the reference: `requested` if given (validated),
/// otherwise by increasing hop distance, then index.
pub fn composition_order(tree: &BfsTree, requested: Option<&[usize]>) -> Result<Vec<usize>> {
    let n = tree.hops.len();
    match requested {
        Some(order) => {
            let mut seen = vec![false; n];
            for &i in order {
                if i >= n || i == tree.root || seen[i] {
                    return Err(StitchError::InvalidInput(format!(
                        "composition order {order:?} must list each non-reference image once (reference {})",
                        tree.root
                    )));
                }
                seen[i] = true;
            }
            if order.len() + 1 != n {
                return Err(StitchError::InvalidInput(format!(
                    "composition order {order:?} lists {} of {} non-reference images",
                    order.len(),
                    n.saturating_sub(1)
                )));
            }
            Ok(order.to_vec())
        }
        None => {
            let mut rest: Vec<(usize, usize)> = (0..n)
                .filter(|&i| i != tree.root)
                .map(|i| (tree.hops[i].unwrap_or(usize::MAX), i))
                .collect();
            rest.sort_unstable();
            Ok(rest.into_iter().map(|(_, i)| i).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_centre_is_the_middle() {
        let g = PairGraph::new(3, &[(0, 1), (1, 2)]).unwrap();
        assert_eq!(g.centre(), 1);
        let g = PairGraph::new(2, &[(1, 0)]).unwrap();
        assert_eq!(g.centre(), 0);
        let g = PairGraph::new(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]).unwrap();
        assert_eq!(g.centre(), 2);
    }

    #[test]
    fn disconnected_graph_is_rejected() {
        let g = PairGraph::new(4, &[(0, 1), (2, 3)]).unwrap();
        let err = g.ensure_connected().unwrap_err();
        assert!(matches!(err, StitchError::InsufficientData { needed: 4, got: 2, .. }));
    }

    #[test]
    fn invalid_edges_are_rejected() {
        assert!(PairGraph::new(2, &[(0, 0)]).is_err());
        assert!(PairGraph::new(2, &[(0, 2)]).is_err());
    }

    #[test]
    fn bfs_parents_follow_edges() {
        let g = PairGraph::new(4, &[(0, 1), (2, 1), (3, 2)]).unwrap();
        let tree = g.bfs(1);
        assert_eq!(tree.hops, vec![Some(1), Some(0), Some(1), Some(2)]);
        assert_eq!(tree.parent[3], Some((2, 2)));
        assert_eq!(tree.parent[2], Some((1, 1)));
        assert_eq!(tree.visit_order, vec![1, 0, 2, 3]);
    }

    #[test]
    fn default_order_is_by_hops_then_index() {
        let g = PairGraph::new(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]).unwrap();
        let tree = g.bfs(2);
        assert_eq!(composition_order(&tree, None).unwrap(), vec![1, 3, 0, 4]);
    }

    #[test]
    fn requested_order_is_validated() {
        let g = PairGraph::new(3, &[(0, 1), (1, 2)]).unwrap();
        let tree = g.bfs(1);
        assert_eq!(composition_order(&tree, Some(&[2, 0])).unwrap(), vec![2, 0]);
        assert!(composition_order(&tree, Some(&[2])).is_err());
        assert!(composition_order(&tree, Some(&[2, 2])).is_err());
        assert!(composition_order(&tree, Some(&[1, 0])).is_err());
    }
}
