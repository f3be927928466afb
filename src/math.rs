//! Math kernel: elementwise activation, matrix-vector products, outer
//! products, RMSE and the quantization primitives shared by the
//! autoencoder and the correlation clusterer.

/// Sigmoid activation, elementwise-safe at the scalar level.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Elementwise sigmoid over a vector.
pub fn sigmoid_vec(v: &[f64]) -> Vec<f64> {
    v.iter().copied().map(sigmoid).collect()
}

/// `x^T * w` where `w` is row-major `rows x cols` (`x.len() == rows`),
/// producing a vector of length `cols`.
pub fn vec_matmul(x: &[f64], w: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    debug_assert_eq!(x.len(), rows);
    debug_assert_eq!(w.len(), rows * cols);
    let mut out = vec![0.0; cols];
    for (i, &xi) in x.iter().enumerate() {
        if xi == 0.0 {
            continue;
        }
        let row = &w[i * cols..(i + 1) * cols];
        for (o, &wij) in out.iter_mut().zip(row.iter()) {
            *o += xi * wij;
        }
    }
    out
}

/// `w * h` where `w` is row-major `rows x cols` and `h` has length `cols`,
/// producing a vector of length `rows` (i.e. `w^T` applied to `h` when `w`
/// is the same matrix used for encoding, as used by tied-weight decoding).
pub fn matmul_vec_transposed(h: &[f64], w: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    debug_assert_eq!(h.len(), cols);
    debug_assert_eq!(w.len(), rows * cols);
    let mut out = vec![0.0; rows];
    for (r, o) in out.iter_mut().enumerate() {
        let row = &w[r * cols..(r + 1) * cols];
        *o = row.iter().zip(h.iter()).map(|(wij, hj)| wij * hj).sum();
    }
    out
}

/// Outer product `a ⊗ b`, row-major, shape `a.len() x b.len()`.
pub fn outer(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(a.len() * b.len());
    for &ai in a {
        for &bi in b {
            out.push(ai * bi);
        }
    }
    out
}

/// RMSE of a vector: `sqrt(mean(v^2))`.
pub fn rmse(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let mean_sq: f64 = v.iter().map(|x| x * x).sum::<f64>() / v.len() as f64;
    mean_sq.sqrt()
}

/// `quantize(x, k)`: discretize each element of `x` onto the `2^k - 1`
/// point grid in `[0, 1]`.
pub fn quantize(x: &[f64], k: u32) -> Vec<f64> {
    let n = f64::from(2_u32.pow(k) - 1);
    x.iter().map(|&v| (n * v).round() / n).collect()
}

/// `quantize_weights(w, k)`: tanh-squash `w` to `[-1, 1]`, rescale by the
/// single scalar `max(|tanh(w)|)` over the whole array into `[0, 1]`,
/// quantize, then rescale back to `[-1, 1]`.
pub fn quantize_weights(w: &[f64], k: u32) -> Vec<f64> {
    let t: Vec<f64> = w.iter().map(|&v| v.tanh()).collect();
    let max_abs = t.iter().fold(0.0_f64, |acc, &v| acc.max(v.abs()));
    let scale = if max_abs == 0.0 { 1.0 } else { max_abs };
    let q: Vec<f64> = t.iter().map(|&v| 0.5 * v / scale + 0.5).collect();
    quantize(&q, k).iter().map(|&v| 2.0 * v - 1.0).collect()
}

/// Round every element of `x` to `precision` decimal digits.
pub fn squeeze_features(x: &[f64], precision: i32) -> Vec<f64> {
    let scale = 10f64.powi(precision);
    x.iter().map(|&v| (v * scale).round() / scale).collect()
}
