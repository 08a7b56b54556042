#![deny(missing_docs)]

//! Evaluation pool dispatching likelihood evaluations to worker processes.
//!
//! The sampler only sees [`xmc_core::EvaluationPool`]; this crate provides
//! the implementation used by the command-line driver: a project file with
//! the parameter model and worker command, one long-lived worker per
//! evaluation target, and chunked dispatch of each batch across them.

/// Log-space handling of normalisation parameters.
pub mod lognorm;
/// Chunked batch dispatch across workers.
pub mod pool;
/// Project file schema.
pub mod project;
/// Evaluation target list helpers.
pub mod targets;
/// Worker trait and the process-backed implementation.
pub mod worker;

use std::path::PathBuf;

use xmc_core::XmcError;

pub use lognorm::apply_log_norm;
pub use pool::ChunkedPool;
pub use project::ProjectSpec;
pub use targets::{expand_targets, split_target_list};
pub use worker::{CommandWorker, Worker, WorkerOptions, LOCAL_TARGET};

/// Options controlling how a pool is assembled from a project file.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Evaluation targets, `NAME*K` shorthand allowed.
    pub systems: Vec<String>,
    /// Number of parameter vectors sent to a worker at once.
    pub chunk_size: usize,
    /// Sample normalisation parameters in log10 space.
    pub log_norm: bool,
    /// Pass worker stderr through.
    pub debug: bool,
    /// Directory the workers run in.
    pub working_dir: Option<PathBuf>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            systems: vec![LOCAL_TARGET.to_string()],
            chunk_size: 4,
            log_norm: false,
            debug: false,
            working_dir: None,
        }
    }
}

/// Starts one worker per expanded target and wraps them in a [`ChunkedPool`].
pub fn connect(
    project: &ProjectSpec,
    options: &PoolOptions,
) -> Result<ChunkedPool<CommandWorker>, XmcError> {
    let mut model = project.parameters.clone();
    if options.log_norm {
        apply_log_norm(&mut model);
    }
    let worker_options = WorkerOptions {
        command: project.command.clone(),
        working_dir: options.working_dir.clone(),
        debug: options.debug,
    };
    let targets = expand_targets(&options.systems);
    let workers = targets
        .iter()
        .map(|target| CommandWorker::spawn(target, &worker_options))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(
        workers = workers.len(),
        chunk_size = options.chunk_size,
        parameters = model.ndims(),
        "evaluation pool ready"
    );
    ChunkedPool::new(model, workers, options.chunk_size)
}
