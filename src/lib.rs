//! Online, unsupervised anomaly-detection engine over fixed-length numeric
//! feature vectors, for streaming network/telemetry pipelines.
//!
//! Two subsystems do the work:
//!
//! - [`fm`]: incremental correlation-based feature clustering, deriving a
//!   bounded-size partition of the input dimensions via single-linkage
//!   agglomerative clustering.
//! - [`ae`]: a single-hidden-layer denoising autoencoder with online SGD
//!   training, online min/max normalization and optional quantization.
//!
//! [`ensemble::Kitnet`] orchestrates a two-level ensemble of these
//! autoencoders (one per feature cluster, feeding a single output
//! autoencoder) through a three-phase lifecycle: FM-train, AD-train,
//! execute.

pub mod ae;
pub mod config;
pub mod ensemble;
pub mod error;
pub mod fm;
pub mod math;

pub use ae::{AeParams, Autoencoder};
pub use config::{AeConfig, KitnetConfig, QuantConfig};
pub use ensemble::export::ExportModel;
pub use ensemble::snapshot::{FileSnapshotSink, InMemorySnapshotSink, NormSnapshot, NormSnapshotSink};
pub use ensemble::{Kitnet, KitnetParams};
pub use error::{KitsuneError, Result};
pub use fm::CorrClust;
