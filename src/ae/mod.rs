//! Single-hidden-layer denoising autoencoder (C2): online SGD training,
//! reconstruction scoring, online min/max normalization and optional
//! quantization.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{AeConfig, AE_RNG_SEED, NORM_EPSILON};
use crate::error::{KitsuneError, Result};
use crate::math::{self, sigmoid};

/// Dense weight/bias blob for an autoencoder, suitable for persistence or
/// hand-off to a downstream tensor-graph runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AeParams {
    /// Row-major `n_visible x n_hidden` weight matrix.
    pub w: Vec<f64>,
    pub b_h: Vec<f64>,
    pub b_v: Vec<f64>,
}

/// A single denoising autoencoder. State is entirely instance-local: the
/// only "global" is the fixed RNG seed, and each autoencoder seeds its own
/// `StdRng` rather than sharing one.
#[derive(Debug, Clone)]
pub struct Autoencoder {
    config: AeConfig,
    n_hidden: usize,
    w: Vec<f64>,
    b_h: Vec<f64>,
    b_v: Vec<f64>,
    norm_min: Vec<f64>,
    norm_max: Vec<f64>,
    n_seen: u64,
    rng: StdRng,
}

impl Autoencoder {
    /// Construct a fresh autoencoder: weights drawn uniformly from
    /// `(-1/n_visible, +1/n_visible)` with a deterministic seed, biases
    /// zero, normalization bounds at their absorbing identities.
    pub fn new(config: AeConfig) -> Self {
        let n_hidden = config.resolved_hidden();
        let n_visible = config.n_visible;
        let mut rng = StdRng::seed_from_u64(AE_RNG_SEED);
        let a = 1.0 / n_visible as f64;
        let mut w: Vec<f64> = (0..n_visible * n_hidden)
            .map(|_| rng.gen_range(-a..a))
            .collect();
        if let Some(q) = config.quantize {
            w = math::quantize_weights(&w, q.w_bits);
        }
        Self {
            config,
            n_hidden,
            w,
            b_h: vec![0.0; n_hidden],
            b_v: vec![0.0; n_visible],
            norm_min: vec![f64::INFINITY; n_visible],
            norm_max: vec![f64::NEG_INFINITY; n_visible],
            n_seen: 0,
            rng,
        }
    }

    pub fn n_visible(&self) -> usize {
        self.config.n_visible
    }

    pub fn n_hidden(&self) -> usize {
        self.n_hidden
    }

    pub fn n_seen(&self) -> u64 {
        self.n_seen
    }

    /// Whether `execute` would currently return `0.0` regardless of input.
    pub fn in_grace(&self) -> bool {
        self.n_seen < self.config.grace_period
    }

    fn normalize_and_update(&mut self, x: &[f64]) -> Vec<f64> {
        for (i, &xi) in x.iter().enumerate() {
            if xi > self.norm_max[i] {
                self.norm_max[i] = xi;
            }
            if xi < self.norm_min[i] {
                self.norm_min[i] = xi;
            }
        }
        self.normalize_with_current_bounds(x)
    }

    fn normalize_with_current_bounds(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(i, &xi)| {
                (xi - self.norm_min[i]) / (self.norm_max[i] - self.norm_min[i] + NORM_EPSILON)
            })
            .collect()
    }

    fn corrupt(&mut self, x: &[f64]) -> Vec<f64> {
        let p_c = self.config.corruption_level;
        if p_c <= 0.0 {
            return x.to_vec();
        }
        let keep_prob = 1.0 - p_c;
        x.iter()
            .map(|&xi| if self.rng.gen_bool(keep_prob) { xi } else { 0.0 })
            .collect()
    }

    /// Encode: `sigmoid(x * W + b_h)`, optionally activation-quantized.
    fn encode(&self, x: &[f64]) -> Vec<f64> {
        let pre = math::vec_matmul(x, &self.w, self.config.n_visible, self.n_hidden);
        let mut y: Vec<f64> = pre
            .iter()
            .zip(self.b_h.iter())
            .map(|(p, b)| sigmoid(p + b))
            .collect();
        if let Some(q) = self.config.quantize {
            y = math::quantize(&y, q.a_bits);
        }
        y
    }

    /// Decode (tied weights): `sigmoid(W * y + b_v)`.
    fn decode(&self, y: &[f64]) -> Vec<f64> {
        let pre = math::matmul_vec_transposed(y, &self.w, self.config.n_visible, self.n_hidden);
        pre.iter()
            .zip(self.b_v.iter())
            .map(|(p, b)| sigmoid(p + b))
            .collect()
    }

    /// Preprocess raw `x` identically for train and execute: normalize
    /// (updating bounds only for train), then precision-squeeze.
    fn preprocess_train(&mut self, x: &[f64]) -> Vec<f64> {
        let normalized = if self.config.normalize {
            self.normalize_and_update(x)
        } else {
            x.to_vec()
        };
        match self.config.input_precision {
            Some(p) => math::squeeze_features(&normalized, p),
            None => normalized,
        }
    }

    fn preprocess_execute(&self, x: &[f64]) -> Vec<f64> {
        let normalized = if self.config.normalize {
            self.normalize_with_current_bounds(x)
        } else {
            x.to_vec()
        };
        match self.config.input_precision {
            Some(p) => math::squeeze_features(&normalized, p),
            None => normalized,
        }
    }

    /// Train on one observation: updates normalization bounds, performs a
    /// single tied-weight denoising SGD step, returns the reconstruction
    /// RMSE.
    pub fn train(&mut self, x: &[f64]) -> f64 {
        self.n_seen += 1;
        let x = self.preprocess_train(x);
        let x_tilde = self.corrupt(&x);

        let y = self.encode(&x_tilde);
        let z = self.decode(&y);

        // L_vis = x - z; L_hid = (L_vis * W) ⊙ y ⊙ (1 - y)
        let l_vis: Vec<f64> = x.iter().zip(z.iter()).map(|(a, b)| a - b).collect();
        let l_vis_w = math::vec_matmul(&l_vis, &self.w, self.config.n_visible, self.n_hidden);
        let l_hid: Vec<f64> = l_vis_w
            .iter()
            .zip(y.iter())
            .map(|(lw, yi)| lw * yi * (1.0 - yi))
            .collect();

        let lr = self.config.lr;
        let d_w1 = math::outer(&x_tilde, &l_hid);
        let d_w2 = math::outer(&l_vis, &y);
        for ((w, d1), d2) in self.w.iter_mut().zip(d_w1.iter()).zip(d_w2.iter()) {
            *w += lr * (d1 + d2);
        }
        for (b, l) in self.b_h.iter_mut().zip(l_hid.iter()) {
            *b += lr * l;
        }
        for (b, l) in self.b_v.iter_mut().zip(l_vis.iter()) {
            *b += lr * l;
        }

        if let Some(q) = self.config.quantize {
            self.w = math::quantize_weights(&self.w, q.w_bits);
            self.b_h = math::quantize_weights(&self.b_h, q.w_bits);
            self.b_v = math::quantize_weights(&self.b_v, q.w_bits);
        }

        math::rmse(&l_vis)
    }

    /// Forward pass without corruption, used by `execute`.
    pub fn reconstruct(&self, x: &[f64]) -> Vec<f64> {
        let y = self.encode(x);
        self.decode(&y)
    }

    /// Score one observation without updating any state. Returns `0.0`
    /// while `n_seen < grace_period`.
    pub fn execute(&self, x: &[f64]) -> f64 {
        if self.in_grace() {
            return 0.0;
        }
        let x = self.preprocess_execute(x);
        let z = self.reconstruct(&x);
        let diff: Vec<f64> = x.iter().zip(z.iter()).map(|(a, b)| a - b).collect();
        math::rmse(&diff)
    }

    /// Current per-feature normalization bounds, used by the ensemble for
    /// the side-channel normalization snapshot.
    pub fn norm_bounds(&self) -> (&[f64], &[f64]) {
        (&self.norm_min, &self.norm_max)
    }

    pub fn get_params(&self) -> AeParams {
        AeParams {
            w: self.w.clone(),
            b_h: self.b_h.clone(),
            b_v: self.b_v.clone(),
        }
    }

    /// Replace weights/biases in place. The caller must respect the
    /// existing shapes; normalization bounds and quantization config are
    /// not restored here (see the normalization snapshot side channel).
    pub fn set_params(&mut self, params: AeParams) -> Result<()> {
        if params.w.len() != self.w.len() {
            return Err(KitsuneError::ShapeMismatch {
                expected: (self.config.n_visible, self.n_hidden),
                actual: (params.w.len(), 1),
            });
        }
        if params.b_h.len() != self.b_h.len() || params.b_v.len() != self.b_v.len() {
            return Err(KitsuneError::ShapeMismatch {
                expected: (self.b_v.len(), self.b_h.len()),
                actual: (params.b_v.len(), params.b_h.len()),
            });
        }
        self.w = params.w;
        self.b_h = params.b_h;
        self.b_v = params.b_v;
        Ok(())
    }
}
