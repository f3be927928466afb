//! Single-linkage agglomerative clustering over a dense distance matrix,
//! and dendrogram descent into bounded-size clusters.
//!
//! Built directly off the symmetric `n x n` correlation-distance matrix
//! rather than first extracting an explicit condensed vector: taking the
//! minimum over `i != j` entries is equivalent to operating on the strict
//! upper-triangular condensed form, since the matrix is symmetric with a
//! zero diagonal in the limit.

/// A node in the single-linkage dendrogram. Leaves are kept sorted
/// ascending so that `breakClust`'s pre-order descent emits sorted leaf
/// indices per cluster.
struct DendroNode {
    leaves: Vec<usize>,
    left: Option<Box<DendroNode>>,
    right: Option<Box<DendroNode>>,
}

/// Build the single-linkage dendrogram for `n` items given their dense
/// `n x n` row-major distance matrix `d`.
///
/// Uses the classic Lance-Williams update for single linkage
/// (`d(new, k) = min(d(a, k), d(b, k))`), merging the closest pair of
/// active clusters at each step. Ties are broken by ascending cluster id,
/// which for the initial singleton clusters coincides with the
/// strict-upper-triangular row-major enumeration order of the original
/// feature pairs, keeping the result reproducible.
fn build_dendrogram(d: &[f64], n: usize) -> DendroNode {
    assert!(n >= 1, "cannot build a dendrogram over zero items");
    let total_nodes = 2 * n - 1;
    let mut dist = vec![f64::INFINITY; total_nodes * total_nodes];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                dist[i * total_nodes + j] = d[i * n + j];
            }
        }
    }

    let mut nodes: Vec<Option<DendroNode>> = (0..total_nodes)
        .map(|i| {
            if i < n {
                Some(DendroNode {
                    leaves: vec![i],
                    left: None,
                    right: None,
                })
            } else {
                None
            }
        })
        .collect();

    let mut active: Vec<usize> = (0..n).collect();
    let mut next_id = n;

    while active.len() > 1 {
        let mut best = (f64::INFINITY, usize::MAX, usize::MAX);
        for (pi, &a) in active.iter().enumerate() {
            for &b in &active[pi + 1..] {
                let (lo, hi) = (a.min(b), a.max(b));
                let dab = dist[lo * total_nodes + hi];
                if dab < best.0 {
                    best = (dab, lo, hi);
                }
            }
        }
        let (_, a, b) = best;

        let mut left_leaves = nodes[a].as_ref().unwrap().leaves.clone();
        let right_leaves = nodes[b].as_ref().unwrap().leaves.clone();
        left_leaves.extend(right_leaves);
        left_leaves.sort_unstable();

        let merged = DendroNode {
            leaves: left_leaves,
            left: nodes[a].take().map(Box::new),
            right: nodes[b].take().map(Box::new),
        };

        for &k in &active {
            if k == a || k == b {
                continue;
            }
            let (lo_a, hi_a) = (a.min(k), a.max(k));
            let (lo_b, hi_b) = (b.min(k), b.max(k));
            let d_new = dist[lo_a * total_nodes + hi_a].min(dist[lo_b * total_nodes + hi_b]);
            let (lo_n, hi_n) = (next_id.min(k), next_id.max(k));
            dist[lo_n * total_nodes + hi_n] = d_new;
        }

        nodes[next_id] = Some(merged);
        active.retain(|&x| x != a && x != b);
        active.push(next_id);
        next_id += 1;
    }

    nodes[active[0]].take().unwrap()
}

/// Descend the dendrogram, emitting each node's sorted leaf indices as one
/// cluster once its leaf count drops to `max_clust` or below; otherwise
/// recurse into the left child then the right child.
fn break_clust(node: &DendroNode, max_clust: usize, out: &mut Vec<Vec<usize>>) {
    if node.leaves.len() <= max_clust {
        out.push(node.leaves.clone());
        return;
    }
    if let Some(left) = &node.left {
        break_clust(left, max_clust, out);
    }
    if let Some(right) = &node.right {
        break_clust(right, max_clust, out);
    }
}

/// Cluster `n` items given their dense distance matrix `d`, returning
/// clusters in left-then-right pre-order, each of size at most `max_clust`.
pub fn cluster(d: &[f64], n: usize, max_clust: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return Vec::new();
    }
    let dendro = build_dendrogram(d, n);
    let mut out = Vec::new();
    break_clust(&dendro, max_clust.max(1), &mut out);
    out
}
