use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xmc_core::errors::ErrorInfo;
use xmc_core::XmcError;

/// YAML-configurable parameters governing a sampling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of walkers in the ensemble (even, at least 2).
    #[serde(default = "default_nwalkers")]
    pub nwalkers: usize,
    /// Burn-in iterations discarded before sampling (skipped on resume).
    #[serde(default = "default_nburn")]
    pub nburn: usize,
    /// Total number of recorded iterations.
    #[serde(default = "default_niters")]
    pub niters: usize,
    /// Evaluation targets; `NAME*K` expands to `K` copies of `NAME`.
    #[serde(default = "default_systems")]
    pub systems: Vec<String>,
    /// Binary checkpoint path.
    #[serde(default = "default_output_checkpoint")]
    pub output_checkpoint: PathBuf,
    /// Text chain export path.
    #[serde(default = "default_output_chain")]
    pub output_chain: PathBuf,
    /// Continue from the existing checkpoint instead of starting afresh.
    #[serde(default)]
    pub continue_run: bool,
    /// Verbose logging and worker stderr passthrough.
    #[serde(default)]
    pub debug: bool,
    /// Keep workers in the caller's directory instead of the project's.
    #[serde(default)]
    pub no_chdir: bool,
    /// Whitespace-delimited matrix of starting positions (rows = walkers).
    #[serde(default)]
    pub initial_parameters: Option<PathBuf>,
    /// Sample normalisation parameters in log10 space.
    #[serde(default)]
    pub log_norm: bool,
    /// Parameter vectors handed to a worker per request.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Checkpointing behaviour.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Iterations between info-level progress lines.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
    /// Stretch-move scale parameter `a`.
    #[serde(default = "default_stretch_scale")]
    pub stretch_scale: f64,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Optional JSON run manifest written when the run ends.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
}

fn default_nwalkers() -> usize {
    50
}

fn default_nburn() -> usize {
    500
}

fn default_niters() -> usize {
    5000
}

fn default_systems() -> Vec<String> {
    vec!["localhost".to_string()]
}

fn default_output_checkpoint() -> PathBuf {
    PathBuf::from("emcee.ckpt")
}

fn default_output_chain() -> PathBuf {
    PathBuf::from("emcee.chain")
}

fn default_chunk_size() -> usize {
    4
}

fn default_progress_every() -> usize {
    1
}

fn default_stretch_scale() -> f64 {
    2.0
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            nwalkers: default_nwalkers(),
            nburn: default_nburn(),
            niters: default_niters(),
            systems: default_systems(),
            output_checkpoint: default_output_checkpoint(),
            output_chain: default_output_chain(),
            continue_run: false,
            debug: false,
            no_chdir: false,
            initial_parameters: None,
            log_norm: false,
            chunk_size: default_chunk_size(),
            checkpoint: CheckpointConfig::default(),
            progress_every: default_progress_every(),
            stretch_scale: default_stretch_scale(),
            seed_policy: SeedPolicy::default(),
            manifest: None,
        }
    }
}

impl RunConfig {
    /// Reads a YAML configuration file; absent keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, XmcError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            XmcError::Config(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_yaml::from_str(&contents).map_err(|err| {
            XmcError::Config(
                ErrorInfo::new("config-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Checks value ranges that do not depend on the parameter model.
    pub fn validate(&self) -> Result<(), XmcError> {
        if self.nwalkers < 2 || self.nwalkers % 2 != 0 {
            return Err(XmcError::Config(
                ErrorInfo::new("config-nwalkers", "walker count must be even and at least 2")
                    .with_context("nwalkers", self.nwalkers.to_string()),
            ));
        }
        if self.niters == 0 {
            return Err(XmcError::Config(ErrorInfo::new(
                "config-niters",
                "iteration count must be positive",
            )));
        }
        if self.chunk_size == 0 {
            return Err(XmcError::Config(ErrorInfo::new(
                "config-chunk-size",
                "chunk size must be at least 1",
            )));
        }
        if self.stretch_scale.is_nan() || self.stretch_scale <= 1.0 {
            return Err(XmcError::Config(
                ErrorInfo::new("config-stretch-scale", "stretch scale must exceed 1")
                    .with_context("stretch_scale", self.stretch_scale.to_string()),
            ));
        }
        Ok(())
    }
}

/// Checkpointing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Write checkpoints periodically while sampling.
    #[serde(default = "default_autosave")]
    pub autosave: bool,
    /// Minimum wall-clock seconds between periodic checkpoints (0 = every iteration).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_autosave() -> bool {
    true
}

fn default_interval_secs() -> u64 {
    600
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            autosave: default_autosave(),
            interval_secs: default_interval_secs(),
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}
