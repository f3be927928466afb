//! Export adaptor (C5): a frozen, parameter-only representation suitable
//! for a downstream tensor-graph runtime to reconstruct a stateless
//! forward pass.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ae::AeParams;
use crate::error::Result;

/// Flat export of every learned weight/bias, the feature partition and
/// the original input width — everything needed to rebuild a stateless
/// forward pass without this crate's training machinery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportModel {
    pub ensemble: Vec<AeParams>,
    pub output: AeParams,
    pub feature_map: Vec<Vec<usize>>,
    pub n: usize,
}

impl ExportModel {
    /// Write the export as pretty JSON to `path`, standing in for the
    /// `.pth` hand-off to a tensor-graph runtime (model export format
    /// choice is an external collaborator's concern; JSON keeps the
    /// representation self-describing for the downstream converter).
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
