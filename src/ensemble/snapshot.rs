//! Side-channel normalization-parameter snapshot, written after every
//! AD-train step (S1) as a simple keyed blob of 1-D numeric arrays.
//!
//! Mirrors `baseline::ThresholdManager::save_to_file` / `load_from_file`:
//! JSON via `serde_json` plus `std::fs`, rather than a binary pickle
//! format, since the crate has no Python interop requirement of its own.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Keyed blob of 1-D arrays: `norm_min_<first_feature_idx>`,
/// `norm_max_<first_feature_idx>` per ensemble cluster, plus
/// `norm_min_output`/`norm_max_output`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormSnapshot {
    pub entries: BTreeMap<String, Vec<f64>>,
}

impl NormSnapshot {
    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.entries.get(key).map(Vec::as_slice)
    }
}

/// Destination for normalization snapshots. The default
/// [`FileSnapshotSink`] writes to a caller-supplied path; tests may
/// substitute [`InMemorySnapshotSink`] to avoid touching disk, per the
/// allowance that this is the only disk interaction on the hot path.
pub trait NormSnapshotSink: fmt::Debug {
    fn write(&mut self, snapshot: &NormSnapshot) -> Result<()>;
}

/// Writes the snapshot as pretty JSON to a fixed path, overwriting on
/// every call (the source overwrites after every training step; see
/// `DESIGN.md` for the durability-policy decision).
#[derive(Debug, Clone)]
pub struct FileSnapshotSink {
    path: PathBuf,
}

impl FileSnapshotSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl NormSnapshotSink for FileSnapshotSink {
    fn write(&mut self, snapshot: &NormSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, json)?;
        debug!(path = %self.path.display(), "wrote normalization snapshot");
        Ok(())
    }
}

/// In-memory sink for tests: keeps only the most recent snapshot, no disk
/// I/O.
#[derive(Debug, Clone, Default)]
pub struct InMemorySnapshotSink {
    pub last: Option<NormSnapshot>,
}

impl NormSnapshotSink for InMemorySnapshotSink {
    fn write(&mut self, snapshot: &NormSnapshot) -> Result<()> {
        self.last = Some(snapshot.clone());
        Ok(())
    }
}

/// Write a snapshot through a sink, logging rather than propagating a
/// failure — the persistence write is best-effort from the engine's
/// perspective (see spec §5/§7).
pub fn write_best_effort(sink: &mut dyn NormSnapshotSink, snapshot: &NormSnapshot) {
    if let Err(e) = sink.write(snapshot) {
        warn!(error = %e, "failed to persist normalization snapshot");
    }
}
