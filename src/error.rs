//! Error types for the ensemble engine and its subsystems.

use thiserror::Error;

/// Errors surfaced by the autoencoder, correlation clusterer and ensemble
/// orchestrator.
#[derive(Debug, Error)]
pub enum KitsuneError {
    /// `execute` was called on the ensemble before a feature map exists.
    #[error("cannot execute: no feature map has been learned or supplied yet")]
    NoFeatureMap,

    /// A parameter blob does not match the shape the receiving component
    /// already allocated.
    #[error("shape mismatch restoring parameters: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The ensemble layer count in a restored parameter blob does not match
    /// the number of autoencoders currently allocated.
    #[error("ensemble size mismatch: expected {expected} autoencoders, blob has {actual}")]
    EnsembleSizeMismatch { expected: usize, actual: usize },

    /// I/O error writing or reading a persistence file (snapshot or export).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error on a parameter blob or snapshot.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KitsuneError>;
