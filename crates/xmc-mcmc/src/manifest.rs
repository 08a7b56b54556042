use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xmc_core::errors::ErrorInfo;
use xmc_core::{RunProvenance, XmcError};

use crate::config::RunConfig;
use crate::kernel::{RunOutcome, RunSummary};

/// Manifest describing a finished or interrupted run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Configuration used for the run.
    pub config: RunConfig,
    /// Master seed used to derive the initial-state and sampler streams.
    pub master_seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Iterations present in the checkpoint.
    pub filled: usize,
    /// Iterations requested.
    pub requested: usize,
    /// Iteration the run resumed from, if any.
    pub resumed_from: Option<usize>,
    /// Checkpoint written by the run.
    pub checkpoint: PathBuf,
    /// Text chain, only present for completed runs.
    pub chain: Option<PathBuf>,
    /// Project and tool provenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<RunProvenance>,
    /// RFC 3339 timestamp of when the manifest was produced.
    pub created_at: String,
}

impl RunManifest {
    /// Builds a manifest from a run summary.
    pub fn from_summary(
        config: &RunConfig,
        summary: &RunSummary,
        provenance: Option<RunProvenance>,
    ) -> Self {
        Self {
            config: config.clone(),
            master_seed: config.seed_policy.master_seed,
            seed_label: config.seed_policy.label.clone(),
            outcome: summary.outcome,
            filled: summary.filled,
            requested: summary.requested,
            resumed_from: summary.resumed_from,
            checkpoint: summary.checkpoint_path.clone(),
            chain: summary.chain_path.clone(),
            provenance,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Writes the manifest to a JSON file.
    pub fn write(&self, path: &Path) -> Result<(), XmcError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                XmcError::Serde(
                    ErrorInfo::new("manifest-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            XmcError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            XmcError::Serde(
                ErrorInfo::new("manifest-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, XmcError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            XmcError::Serde(
                ErrorInfo::new("manifest-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            XmcError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}
