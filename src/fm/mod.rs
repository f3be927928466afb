//! Incremental correlation-based feature clustering (C3 / FM).
//!
//! Maintains a running correlation-distance summary over the input
//! dimensions and, on demand, derives a bounded-size partition of the
//! feature index set via single-linkage agglomerative clustering.

mod cluster;

use crate::config::CORR_DIST_EPSILON;
use crate::math::outer;

/// Incremental correlation accumulator over `n` input dimensions.
///
/// `c_r` is updated using the *current-step* mean `c/N` rather than the
/// prior-step mean — this is a deliberate, accepted approximation to a
/// true running mean, not a bug. Reproducing it faithfully (rather than
/// switching to Welford's algorithm) is required for `corrDist` to match
/// the reference behavior; the resulting small negative distances are
/// clamped to zero in `corr_dist`.
#[derive(Debug, Clone)]
pub struct CorrClust {
    n: usize,
    count: u64,
    c: Vec<f64>,
    c_r: Vec<f64>,
    c_rs: Vec<f64>,
    c_mat: Vec<f64>,
}

impl CorrClust {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            count: 0,
            c: vec![0.0; n],
            c_r: vec![0.0; n],
            c_rs: vec![0.0; n],
            c_mat: vec![0.0; n * n],
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Absorb one observation. Cost is `O(n^2)` (the outer-product
    /// accumulation).
    pub fn update(&mut self, x: &[f64]) {
        debug_assert_eq!(x.len(), self.n);
        self.count += 1;
        let n_f = self.count as f64;

        for (ci, &xi) in self.c.iter_mut().zip(x.iter()) {
            *ci += xi;
        }

        let r: Vec<f64> = x
            .iter()
            .zip(self.c.iter())
            .map(|(&xi, &ci)| xi - ci / n_f)
            .collect();

        for (cr, &ri) in self.c_r.iter_mut().zip(r.iter()) {
            *cr += ri;
        }
        for (crs, &ri) in self.c_rs.iter_mut().zip(r.iter()) {
            *crs += ri * ri;
        }

        let rr = outer(&r, &r);
        for (cm, rv) in self.c_mat.iter_mut().zip(rr.iter()) {
            *cm += rv;
        }
    }

    /// The `n x n` correlation-distance matrix, row-major, symmetric,
    /// entries clamped to `>= 0`. Zero-scale entries (constant features)
    /// are protected against division by zero with a near-zero sentinel.
    pub fn corr_dist(&self) -> Vec<f64> {
        let s: Vec<f64> = self.c_rs.iter().map(|v| v.max(0.0).sqrt()).collect();
        let scale = outer(&s, &s);
        let mut d = vec![0.0; self.n * self.n];
        for i in 0..self.n * self.n {
            let denom = if scale[i] == 0.0 { CORR_DIST_EPSILON } else { scale[i] };
            d[i] = (1.0 - self.c_mat[i] / denom).max(0.0);
        }
        d
    }

    /// Derive a partition of `{0, ..., n-1}` into clusters of size at most
    /// `max_clust` (clamped into `[1, n]`), via single-linkage agglomerative
    /// clustering on the correlation-distance matrix. Clusters are returned
    /// in left-then-right pre-order of the merge dendrogram.
    pub fn cluster(&self, max_clust: usize) -> Vec<Vec<usize>> {
        let clamped = max_clust.clamp(1, self.n.max(1));
        let d = self.corr_dist();
        cluster::cluster(&d, self.n, clamped)
    }
}
