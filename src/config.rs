//! Typed configuration records for the autoencoder and the ensemble
//! orchestrator.
//!
//! Kept as explicit configuration structs rather than constructor
//! parameter lists or subclasses, so the autoencoder's four orthogonal
//! behavioral toggles (normalize, input precision, corruption, quantize)
//! compose freely.

use serde::{Deserialize, Serialize};

/// Fixed seed for all autoencoder weight initialization, reproduced from
/// the reference implementation. Every `Autoencoder` gets its own
/// `StdRng::seed_from_u64(AE_RNG_SEED)` — never a shared or thread-local RNG.
pub const AE_RNG_SEED: u64 = 1234;

/// Additive floor in the 0-1 normalization denominator, guards against
/// division by zero on constant features.
pub const NORM_EPSILON: f64 = 1e-16;

/// Sentinel value substituted for zero entries in the correlation-distance
/// scale matrix, guards against division by zero on constant features.
pub const CORR_DIST_EPSILON: f64 = 1e-100;

/// Weight/activation quantization bit widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantConfig {
    /// Bits used to quantize weights and biases (`w_bits`).
    pub w_bits: u32,
    /// Bits used to quantize hidden activations (`a_bits`).
    pub a_bits: u32,
}

/// Per-autoencoder configuration. Either `n_hidden` or `hidden_ratio` must
/// determine the hidden layer width; when `hidden_ratio` is set it wins,
/// with `n_hidden = ceil(n_visible * hidden_ratio)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AeConfig {
    /// Visible (input) layer width.
    pub n_visible: usize,
    /// Hidden layer width, used verbatim unless `hidden_ratio` is set.
    pub n_hidden: usize,
    /// When set, overrides `n_hidden` as `ceil(n_visible * hidden_ratio)`.
    pub hidden_ratio: Option<f64>,
    /// Stochastic gradient descent learning rate.
    pub lr: f64,
    /// Bernoulli corruption probability applied to inputs during training.
    pub corruption_level: f64,
    /// Number of observations before `execute` returns non-zero scores.
    pub grace_period: u64,
    /// Whether to maintain and apply online 0-1 min/max normalization.
    pub normalize: bool,
    /// Optional number of significant decimal digits to round inputs to.
    pub input_precision: Option<i32>,
    /// Optional weight/activation quantization.
    pub quantize: Option<QuantConfig>,
}

impl AeConfig {
    /// Resolve the effective hidden width, applying `hidden_ratio` if set.
    pub fn resolved_hidden(&self) -> usize {
        match self.hidden_ratio {
            Some(ratio) => ((self.n_visible as f64) * ratio).ceil() as usize,
            None => self.n_hidden,
        }
    }
}

/// Top-level ensemble configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitnetConfig {
    /// Number of input features (`x ∈ ℝⁿ`).
    pub n: usize,
    /// Maximum autoencoder size in the ensemble layer (`m`, coerced to ≥1).
    pub max_autoencoder_size: usize,
    /// Number of observations spent learning the feature map. Defaults to
    /// `ad_grace_period` if not set at construction.
    pub fm_grace_period: u64,
    /// Number of observations spent training the ensemble/output autoencoders
    /// before the engine starts emitting scores.
    pub ad_grace_period: u64,
    /// Learning rate shared by every autoencoder in the ensemble.
    pub lr: f64,
    /// Hidden-to-visible neuron ratio shared by every autoencoder.
    pub hidden_ratio: f64,
    /// Optional caller-supplied feature map; when set, the FM-train phase
    /// is skipped entirely.
    pub feature_map: Option<Vec<Vec<usize>>>,
    /// Whether autoencoders maintain online 0-1 normalization.
    pub normalize: bool,
    /// Optional input rounding precision (significant decimal digits).
    pub input_precision: Option<i32>,
    /// Optional weight/activation quantization, shared by every autoencoder.
    pub quantize: Option<QuantConfig>,
    /// Base path for persisted artifacts. The normalization snapshot is
    /// written to this path with `.pkl` replaced by `_norm_params.pkl`;
    /// the exported model is written with `.pkl` replaced by `.pth`.
    pub model_path: String,
}

impl KitnetConfig {
    /// Build a configuration with the reference defaults, deriving
    /// `fm_grace_period` from `ad_grace_period` when not explicitly set
    /// (mirrors the Python constructor's `FM_grace_period or AD_grace_period`).
    pub fn new(n: usize, ad_grace_period: u64) -> Self {
        Self {
            n,
            max_autoencoder_size: 10,
            fm_grace_period: ad_grace_period,
            ad_grace_period,
            lr: 0.1,
            hidden_ratio: 0.75,
            feature_map: None,
            normalize: true,
            input_precision: None,
            quantize: None,
            model_path: "kitsune.pkl".to_string(),
        }
    }

    /// Clamp `max_autoencoder_size` into `[1, n]` the way `FM.cluster` does.
    pub fn clamped_max_cluster_size(&self) -> usize {
        self.max_autoencoder_size.clamp(1, self.n.max(1))
    }

    /// Path of the normalization-parameter snapshot derived from
    /// `model_path` (substitutes `.pkl` with `_norm_params.pkl`).
    pub fn norm_params_path(&self) -> String {
        if let Some(stripped) = self.model_path.strip_suffix(".pkl") {
            format!("{stripped}_norm_params.pkl")
        } else {
            format!("{}_norm_params.pkl", self.model_path)
        }
    }

    /// Path of the exported tensor-graph-runtime model derived from
    /// `model_path` (substitutes `.pkl` with `.pth`).
    pub fn export_model_path(&self) -> String {
        if let Some(stripped) = self.model_path.strip_suffix(".pkl") {
            format!("{stripped}.pth")
        } else {
            format!("{}.pth", self.model_path)
        }
    }
}
