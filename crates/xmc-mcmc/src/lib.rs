#![deny(missing_docs)]
#![doc = "Resumable ensemble-MCMC driver: initial states, sampling loop, checkpoints and xspec chain export."]

/// Interrupt handling for graceful stops.
pub mod cancel;
/// Fixed-capacity chain and log-probability buffers.
pub mod chain;
/// Binary checkpoint persistence.
pub mod checkpoint;
/// Run configuration structures.
pub mod config;
/// Deterministic seed derivation.
pub mod determinism;
/// xspec text chain export and import.
pub mod export;
/// Initial walker populations.
pub mod initial;
/// Resumable sampling loop.
pub mod kernel;
/// Run manifest serialization.
pub mod manifest;
/// Progress reporting types.
pub mod metrics;
/// Ensemble sampler seam and the stretch move.
pub mod sampler;

pub use cancel::CancelToken;
pub use chain::ChainBuffer;
pub use checkpoint::{CheckpointRecord, CheckpointStore};
pub use config::{CheckpointConfig, RunConfig, SeedPolicy};
pub use export::{format_g, read_chain, write_chain, ExportedChain};
pub use kernel::{run, run_with_sampler, RunOutcome, RunSummary};
pub use manifest::RunManifest;
pub use metrics::{Phase, ProgressInfo};
pub use sampler::{EnsembleSampler, StretchSampler, WalkerState};
