//! Ensemble orchestrator (C4 / KitNet): the lifecycle state machine that
//! routes features to per-cluster autoencoders, aggregates their scores
//! into a single output autoencoder, and persists normalization state.

pub mod export;
pub mod snapshot;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ae::{AeParams, Autoencoder};
use crate::config::{AeConfig, KitnetConfig};
use crate::error::{KitsuneError, Result};
use crate::fm::CorrClust;

use export::ExportModel;
use snapshot::{FileSnapshotSink, NormSnapshot, NormSnapshotSink};

/// Full parameter blob for the ensemble: every child autoencoder plus the
/// output autoencoder, in allocation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KitnetParams {
    pub ensemble: Vec<AeParams>,
    pub output: AeParams,
}

fn is_skip_sentinel(x: &[f64]) -> bool {
    !x.is_empty() && x.iter().all(|&v| v == -1.0)
}

fn ae_config_for(config: &KitnetConfig, n_visible: usize) -> AeConfig {
    AeConfig {
        n_visible,
        n_hidden: 0,
        hidden_ratio: Some(config.hidden_ratio),
        lr: config.lr,
        corruption_level: 0.0,
        grace_period: 0,
        normalize: config.normalize,
        input_precision: config.input_precision,
        quantize: config.quantize,
    }
}

/// The ensemble orchestrator. Single-threaded and synchronous: `process`
/// is the only streaming entry point and is not reentrant on one instance.
#[derive(Debug)]
pub struct Kitnet {
    config: KitnetConfig,
    fm: CorrClust,
    feature_map: Option<Vec<Vec<usize>>>,
    ensemble: Vec<Autoencoder>,
    output: Option<Autoencoder>,
    n_trained: u64,
    n_executed: u64,
    sink: Box<dyn NormSnapshotSink>,
}

impl Kitnet {
    /// Construct a new ensemble. If `config.feature_map` is set, the
    /// autoencoders are allocated immediately and the FM-train phase
    /// (S0) is skipped; the FM instance is still created but is never
    /// updated.
    pub fn new(config: KitnetConfig) -> Self {
        let sink_path = config.norm_params_path();
        Self::with_sink(config, Box::new(FileSnapshotSink::new(sink_path)))
    }

    /// Construct with an explicit normalization-snapshot sink, e.g. an
    /// in-memory sink for tests that should not touch disk.
    pub fn with_sink(config: KitnetConfig, sink: Box<dyn NormSnapshotSink>) -> Self {
        let fm = CorrClust::new(config.n);
        let mut engine = Self {
            config,
            fm,
            feature_map: None,
            ensemble: Vec::new(),
            output: None,
            n_trained: 0,
            n_executed: 0,
            sink,
        };
        if let Some(v) = engine.config.feature_map.clone() {
            engine.allocate_ad(v);
            info!("Feature-Mapper: execute-mode, Anomaly-Detector: train-mode (preset feature map)");
        } else {
            info!("Feature-Mapper: train-mode, Anomaly-Detector: off-mode");
        }
        engine
    }

    pub fn n_trained(&self) -> u64 {
        self.n_trained
    }

    pub fn n_executed(&self) -> u64 {
        self.n_executed
    }

    pub fn feature_map(&self) -> Option<&[Vec<usize>]> {
        self.feature_map.as_deref()
    }

    pub fn fm(&self) -> &CorrClust {
        &self.fm
    }

    fn allocate_ad(&mut self, v: Vec<Vec<usize>>) {
        self.ensemble = v
            .iter()
            .map(|cluster| Autoencoder::new(ae_config_for(&self.config, cluster.len())))
            .collect();
        self.output = Some(Autoencoder::new(ae_config_for(&self.config, v.len())));
        self.feature_map = Some(v);
    }

    fn sub_vector(cluster: &[usize], x: &[f64]) -> Vec<f64> {
        cluster.iter().map(|&idx| x[idx]).collect()
    }

    fn norm_snapshot(&self) -> NormSnapshot {
        let mut snapshot = NormSnapshot::default();
        if let Some(v) = &self.feature_map {
            for (a, cluster) in v.iter().enumerate() {
                let first = cluster[0];
                let (min, max) = self.ensemble[a].norm_bounds();
                snapshot
                    .entries
                    .insert(format!("norm_min_{first}"), min.to_vec());
                snapshot
                    .entries
                    .insert(format!("norm_max_{first}"), max.to_vec());
            }
            if let Some(output) = &self.output {
                let (min, max) = output.norm_bounds();
                snapshot
                    .entries
                    .insert("norm_min_output".to_string(), min.to_vec());
                snapshot
                    .entries
                    .insert("norm_max_output".to_string(), max.to_vec());
            }
        }
        snapshot
    }

    /// Train on one observation. In S0, updates the correlation
    /// accumulator and realizes the feature map at the FM_grace_period
    /// transition. In S1, trains every ensemble autoencoder and the
    /// output autoencoder, then best-effort persists the normalization
    /// snapshot.
    pub fn train(&mut self, x: &[f64]) {
        if self.feature_map.is_none() {
            self.fm.update(x);
            if self.n_trained == self.config.fm_grace_period {
                let v = self.fm.cluster(self.config.clamped_max_cluster_size());
                info!(
                    n = self.config.n,
                    clusters = v.len(),
                    "Feature-Mapper found a mapping"
                );
                self.allocate_ad(v);
                info!("Feature-Mapper: execute-mode, Anomaly-Detector: train-mode");
            }
        } else {
            let v = self.feature_map.clone().unwrap();
            let mut s = vec![0.0; v.len()];
            for (a, cluster) in v.iter().enumerate() {
                let xi = Self::sub_vector(cluster, x);
                s[a] = self.ensemble[a].train(&xi);
            }
            self.output.as_mut().unwrap().train(&s);

            let snapshot = self.norm_snapshot();
            snapshot::write_best_effort(self.sink.as_mut(), &snapshot);

            if self.n_trained == self.config.fm_grace_period + self.config.ad_grace_period {
                info!("Feature-Mapper: execute-mode, Anomaly-Detector: execute-mode");
            }
        }
        self.n_trained += 1;
    }

    /// Score one observation without updating any training state. Fails
    /// with [`KitsuneError::NoFeatureMap`] if no feature map has been
    /// learned or supplied yet.
    pub fn execute(&mut self, x: &[f64]) -> Result<f64> {
        let v = self
            .feature_map
            .clone()
            .ok_or(KitsuneError::NoFeatureMap)?;
        self.n_executed += 1;
        let mut s = vec![0.0; v.len()];
        for (a, cluster) in v.iter().enumerate() {
            let xi = Self::sub_vector(cluster, x);
            s[a] = self.ensemble[a].execute(&xi);
        }
        Ok(self.output.as_ref().unwrap().execute(&s))
    }

    /// The single streaming entry point. Returns `0.0` and advances no
    /// state for the all-(-1) skip sentinel; otherwise trains while
    /// within the combined grace period, then switches to scoring.
    pub fn process(&mut self, x: &[f64]) -> Result<f64> {
        if is_skip_sentinel(x) {
            return Ok(0.0);
        }
        if self.n_trained > self.config.fm_grace_period + self.config.ad_grace_period {
            self.execute(x)
        } else {
            self.train(x);
            Ok(0.0)
        }
    }

    /// Elementwise `process` over a batch, in order.
    pub fn predict(&mut self, batch: &[Vec<f64>]) -> Result<Vec<f64>> {
        batch.iter().map(|x| self.process(x)).collect()
    }

    /// Sign-flipped wrapper compatible with upstream anomaly-detector
    /// conventions where larger means more normal. Takes and returns
    /// single-row 2-D arrays.
    pub fn decision_function(&mut self, x_2d: &[Vec<f64>]) -> Result<Vec<f64>> {
        let score = self.process(&x_2d[0])?;
        Ok(vec![-score])
    }

    pub fn get_params(&self) -> KitnetParams {
        KitnetParams {
            ensemble: self.ensemble.iter().map(Autoencoder::get_params).collect(),
            output: self
                .output
                .as_ref()
                .map(Autoencoder::get_params)
                .unwrap_or(AeParams {
                    w: Vec::new(),
                    b_h: Vec::new(),
                    b_v: Vec::new(),
                }),
        }
    }

    pub fn set_params(&mut self, params: KitnetParams) -> Result<()> {
        if params.ensemble.len() != self.ensemble.len() {
            return Err(KitsuneError::EnsembleSizeMismatch {
                expected: self.ensemble.len(),
                actual: params.ensemble.len(),
            });
        }
        for (ae, p) in self.ensemble.iter_mut().zip(params.ensemble.into_iter()) {
            ae.set_params(p)?;
        }
        if let Some(output) = self.output.as_mut() {
            output.set_params(params.output)?;
        }
        Ok(())
    }

    /// Write the export representation to `model_path` with `.pkl`
    /// replaced by `.pth`.
    pub fn export_model(&self) -> Result<()> {
        let feature_map = self.feature_map.clone().ok_or(KitsuneError::NoFeatureMap)?;
        let model = ExportModel {
            ensemble: self.ensemble.iter().map(Autoencoder::get_params).collect(),
            output: self.output.as_ref().unwrap().get_params(),
            feature_map,
            n: self.config.n,
        };
        model.write_to_path(self.config.export_model_path())
    }
}
