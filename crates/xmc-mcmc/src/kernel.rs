use std::path::PathBuf;
use std::time::{Duration, Instant};

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use xmc_core::errors::ErrorInfo;
use xmc_core::{EvaluationPool, ParameterModel, RngHandle, XmcError};

use crate::cancel::CancelToken;
use crate::chain::ChainBuffer;
use crate::checkpoint::CheckpointStore;
use crate::config::RunConfig;
use crate::determinism;
use crate::export;
use crate::initial;
use crate::metrics::{Phase, ProgressInfo};
use crate::sampler::{EnsembleSampler, StretchSampler, WalkerState};

/// How a run that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every requested iteration was recorded; checkpoint and text chain written.
    Completed,
    /// Cancelled between iterations; only the checkpoint was written.
    Interrupted,
}

/// Summary returned to callers after a run ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Iterations recorded in the chain.
    pub filled: usize,
    /// Iterations requested.
    pub requested: usize,
    /// Cursor the run resumed from.
    pub resumed_from: Option<usize>,
    /// Checkpoint location.
    pub checkpoint_path: PathBuf,
    /// Text chain location, set only when the export was written.
    pub chain_path: Option<PathBuf>,
    /// Number of checkpoint writes, including the final one.
    pub checkpoints_written: usize,
    /// Mean acceptance fraction over the recorded iterations of this run.
    pub acceptance_rate: f64,
    /// Wall-clock seconds spent in the run.
    pub elapsed_secs: f64,
}

/// Where sampling starts from.
enum Start {
    Fresh {
        positions: ndarray::Array2<f64>,
    },
    Resume {
        buffer: ChainBuffer,
        state: WalkerState,
    },
}

/// Runs or resumes a chain with the stretch-move sampler.
///
/// The sampler stream is derived from the master seed and the cursor the
/// run starts at.
pub fn run(
    config: &RunConfig,
    pool: &mut dyn EvaluationPool,
    cancel: &CancelToken,
    progress: &mut dyn FnMut(&ProgressInfo),
) -> Result<RunSummary, XmcError> {
    let master_seed = config.seed_policy.master_seed;
    let scale = config.stretch_scale;
    run_with_sampler(config, pool, cancel, progress, |start| {
        StretchSampler::new(scale, determinism::sampler_seed(master_seed, start))
    })
}

/// Runs or resumes a chain with a caller-supplied sampler.
///
/// `make_sampler` receives the iteration the chain starts at (0 for fresh
/// runs) and is only called once every configuration check has passed.
pub fn run_with_sampler<S, F>(
    config: &RunConfig,
    pool: &mut dyn EvaluationPool,
    cancel: &CancelToken,
    progress: &mut dyn FnMut(&ProgressInfo),
    make_sampler: F,
) -> Result<RunSummary, XmcError>
where
    S: EnsembleSampler,
    F: FnOnce(usize) -> Result<S, XmcError>,
{
    let started = Instant::now();
    config.validate()?;
    let model = pool.parameter_model().clone();
    if model.is_empty() {
        return Err(XmcError::Config(ErrorInfo::new(
            "model-empty",
            "the evaluation pool exposes no free parameters",
        )));
    }
    let store = CheckpointStore::new(&config.output_checkpoint);
    let start = prepare(config, &model, &store)?;
    let resumed_from = match &start {
        Start::Resume { buffer, .. } => Some(buffer.filled()),
        Start::Fresh { .. } => None,
    };
    let mut sampler = make_sampler(resumed_from.unwrap_or(0))?;

    tracing::info!(
        nwalkers = config.nwalkers,
        ndims = model.ndims(),
        niters = config.niters,
        resumed_from = ?resumed_from,
        "starting run"
    );

    let (mut buffer, mut state) = match start {
        Start::Resume { buffer, state } => (buffer, state),
        Start::Fresh { positions } => {
            let log_probs = pool.evaluate(positions.view())?;
            check_scores(&log_probs, config.nwalkers)?;
            let mut state = WalkerState::new(positions, log_probs);
            let burned = burn_in(config, pool, &mut sampler, &mut state, cancel, progress)?;
            if !burned {
                tracing::warn!("interrupted during burn-in, nothing recorded");
                return Ok(RunSummary {
                    outcome: RunOutcome::Interrupted,
                    filled: 0,
                    requested: config.niters,
                    resumed_from,
                    checkpoint_path: config.output_checkpoint.clone(),
                    chain_path: None,
                    checkpoints_written: 0,
                    acceptance_rate: 0.0,
                    elapsed_secs: started.elapsed().as_secs_f64(),
                });
            }
            state.reset_acceptance();
            (
                ChainBuffer::new(config.nwalkers, config.niters, model.ndims()),
                state,
            )
        }
    };

    let interval = Duration::from_secs(config.checkpoint.interval_secs);
    let mut last_save = Instant::now();
    let mut checkpoints_written = 0usize;
    let mut outcome = RunOutcome::Completed;
    let phase_start = Instant::now();
    let first = buffer.filled();

    while !buffer.is_full() {
        if cancel.is_cancelled() {
            outcome = RunOutcome::Interrupted;
            break;
        }
        sampler.step(&mut state, pool)?;
        buffer.record(state.positions.view(), state.log_probs.view())?;

        if config.checkpoint.autosave && last_save.elapsed() >= interval {
            store.save(&buffer)?;
            checkpoints_written += 1;
            last_save = Instant::now();
        }

        let info = ProgressInfo {
            phase: Phase::Sampling,
            iteration: buffer.filled(),
            total: buffer.capacity(),
            elapsed: phase_start.elapsed(),
            acceptance_rate: state.mean_acceptance(),
            mean_log_prob: state.mean_log_prob(),
        };
        report(config, &info, first);
        progress(&info);
    }

    store.save(&buffer)?;
    checkpoints_written += 1;

    let chain_path = match outcome {
        RunOutcome::Completed => {
            export::write_chain(&config.output_chain, buffer.chain(), buffer.lnprob(), &model)?;
            Some(config.output_chain.clone())
        }
        RunOutcome::Interrupted => {
            tracing::warn!(
                filled = buffer.filled(),
                requested = buffer.capacity(),
                checkpoint = %store.path().display(),
                "run interrupted, text chain not written"
            );
            None
        }
    };

    Ok(RunSummary {
        outcome,
        filled: buffer.filled(),
        requested: buffer.capacity(),
        resumed_from,
        checkpoint_path: config.output_checkpoint.clone(),
        chain_path,
        checkpoints_written,
        acceptance_rate: state.mean_acceptance(),
        elapsed_secs: started.elapsed().as_secs_f64(),
    })
}

/// Performs every configuration check and loads the starting point.
fn prepare(
    config: &RunConfig,
    model: &ParameterModel,
    store: &CheckpointStore,
) -> Result<Start, XmcError> {
    if config.continue_run {
        if !store.exists() {
            return Err(XmcError::Config(
                ErrorInfo::new(
                    "resume-without-checkpoint",
                    "resume requested but no checkpoint exists",
                )
                .with_context("path", store.path().display().to_string()),
            ));
        }
        let record = store.load()?;
        if record.filled() == 0 {
            return Err(XmcError::Config(
                ErrorInfo::new("resume-empty", "checkpoint holds no iterations")
                    .with_context("path", store.path().display().to_string()),
            ));
        }
        if record.nwalkers() != config.nwalkers || record.ndims() != model.ndims() {
            return Err(XmcError::Config(
                ErrorInfo::new(
                    "resume-shape",
                    "checkpoint does not match the configured walkers and parameters",
                )
                .with_context("path", store.path().display().to_string())
                .with_context(
                    "checkpoint",
                    format!("{}x{}", record.nwalkers(), record.ndims()),
                )
                .with_context(
                    "configured",
                    format!("{}x{}", config.nwalkers, model.ndims()),
                ),
            ));
        }
        let buffer = ChainBuffer::from_checkpoint(&record, config.niters)?;
        let (positions, log_probs) = buffer
            .last_positions()
            .zip(buffer.last_log_probs())
            .ok_or_else(|| {
                XmcError::Config(ErrorInfo::new("resume-empty", "checkpoint holds no iterations"))
            })?;
        return Ok(Start::Resume {
            buffer,
            state: WalkerState::new(positions, log_probs),
        });
    }

    let positions = match &config.initial_parameters {
        Some(path) => {
            let positions = initial::load_population(path)?;
            if positions.dim() != (config.nwalkers, model.ndims()) {
                return Err(XmcError::Config(
                    ErrorInfo::new(
                        "initial-dimensions",
                        "initial parameters do not match the walkers and parameters",
                    )
                    .with_context("path", path.display().to_string())
                    .with_context(
                        "found",
                        format!("{}x{}", positions.nrows(), positions.ncols()),
                    )
                    .with_context(
                        "expected",
                        format!("{}x{}", config.nwalkers, model.ndims()),
                    ),
                ));
            }
            positions
        }
        None => {
            let mut rng = RngHandle::from_seed(determinism::initial_state_seed(
                config.seed_policy.master_seed,
            ));
            initial::build_population(model, config.nwalkers, &mut rng)
        }
    };
    Ok(Start::Fresh { positions })
}

/// Advances `state` through burn-in; returns `false` if cancelled.
fn burn_in<S: EnsembleSampler>(
    config: &RunConfig,
    pool: &mut dyn EvaluationPool,
    sampler: &mut S,
    state: &mut WalkerState,
    cancel: &CancelToken,
    progress: &mut dyn FnMut(&ProgressInfo),
) -> Result<bool, XmcError> {
    if config.nburn == 0 {
        return Ok(true);
    }
    tracing::info!(nburn = config.nburn, "burn-in");
    let phase_start = Instant::now();
    for step in 0..config.nburn {
        if cancel.is_cancelled() {
            return Ok(false);
        }
        sampler.step(state, pool)?;
        let info = ProgressInfo {
            phase: Phase::BurnIn,
            iteration: step + 1,
            total: config.nburn,
            elapsed: phase_start.elapsed(),
            acceptance_rate: state.mean_acceptance(),
            mean_log_prob: state.mean_log_prob(),
        };
        report(config, &info, 0);
        progress(&info);
    }
    tracing::info!(
        acceptance = state.mean_acceptance(),
        mean_lnprob = state.mean_log_prob(),
        "burn-in finished"
    );
    Ok(true)
}

fn report(config: &RunConfig, info: &ProgressInfo, first: usize) {
    let every = config.progress_every.max(1);
    if info.iteration % every == 0 || info.iteration == info.total {
        tracing::info!(
            phase = ?info.phase,
            iteration = info.iteration,
            total = info.total,
            elapsed_secs = info.elapsed.as_secs_f64(),
            remaining_secs = info.remaining(first).map(|left| left.as_secs_f64()),
            acceptance = info.acceptance_rate,
            mean_lnprob = info.mean_log_prob,
            "progress"
        );
    } else {
        tracing::debug!(iteration = info.iteration, total = info.total, "step");
    }
}

fn check_scores(scores: &Array1<f64>, nwalkers: usize) -> Result<(), XmcError> {
    if scores.len() != nwalkers {
        return Err(XmcError::Sampler(
            ErrorInfo::new("pool-length", "pool returned the wrong number of scores")
                .with_context("expected", nwalkers.to_string())
                .with_context("found", scores.len().to_string()),
        ));
    }
    Ok(())
}
