use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Args;
use xmc_core::RunProvenance;
use xmc_mcmc::{run as run_chain, CancelToken, RunConfig, RunManifest, RunOutcome, RunSummary};
use xmc_pool::{connect, split_target_list, PoolOptions, ProjectSpec};

/// Exit status reported when the run stops on an interrupt.
pub const INTERRUPTED_EXIT: u8 = 130;

#[derive(Args, Debug)]
pub struct McmcArgs {
    /// YAML project file with the worker command and free parameters.
    pub project: PathBuf,
    /// YAML run configuration; flags below override its values.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Number of walkers.
    #[arg(long)]
    pub nwalkers: Option<usize>,
    /// Burn-in iterations.
    #[arg(long)]
    pub nburn: Option<usize>,
    /// Total iterations to record.
    #[arg(long)]
    pub niters: Option<usize>,
    /// Space separated evaluation targets, `host*K` repeats a host.
    #[arg(long)]
    pub systems: Option<String>,
    /// Checkpoint file.
    #[arg(long)]
    pub output_checkpoint: Option<PathBuf>,
    /// Text chain file.
    #[arg(long)]
    pub output_chain: Option<PathBuf>,
    /// Continue from the existing checkpoint.
    #[arg(long)]
    pub continue_run: bool,
    /// Verbose logging and worker stderr passthrough.
    #[arg(long)]
    pub debug: bool,
    /// Run workers in the current directory instead of the project's.
    #[arg(long)]
    pub no_chdir: bool,
    /// Starting positions, one walker per line.
    #[arg(long)]
    pub initial_parameters: Option<PathBuf>,
    /// Sample normalisation parameters in log10 space.
    #[arg(long)]
    pub log_norm: bool,
    /// Parameter vectors sent to a worker per request.
    #[arg(long)]
    pub chunk_size: Option<usize>,
    /// Master seed.
    #[arg(long)]
    pub seed: Option<u64>,
    /// JSON manifest written when the run ends.
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

pub fn run(args: McmcArgs) -> Result<ExitCode, Box<dyn Error>> {
    let config = resolve_config(&args)?;
    config.validate()?;
    let project = ProjectSpec::load(&args.project)?;

    let working_dir = if config.no_chdir {
        None
    } else {
        project_dir(&args.project)
    };
    let options = PoolOptions {
        systems: config.systems.clone(),
        chunk_size: config.chunk_size,
        log_norm: config.log_norm,
        debug: config.debug,
        working_dir,
    };
    let mut pool = connect(&project, &options)?;

    let cancel = CancelToken::new();
    cancel.install_interrupt_handler()?;
    let summary = run_chain(&config, &mut pool, &cancel, &mut |_| {})?;
    tracing::info!(
        outcome = ?summary.outcome,
        filled = summary.filled,
        requested = summary.requested,
        acceptance = summary.acceptance_rate,
        elapsed_secs = summary.elapsed_secs,
        "run finished"
    );

    if let Some(path) = &config.manifest {
        let provenance = RunProvenance {
            project_hash: ProjectSpec::hash_file(&args.project)?,
            seed: config.seed_policy.master_seed,
            created_at: String::new(),
            tool_versions: BTreeMap::from([(
                "xmc-sim".to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
            )]),
        };
        let mut manifest = RunManifest::from_summary(&config, &summary, Some(provenance));
        if let Some(provenance) = manifest.provenance.as_mut() {
            provenance.created_at = manifest.created_at.clone();
        }
        manifest.write(path)?;
    }

    Ok(match summary.outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::Interrupted => {
            eprintln!("{}", interrupted_message(&summary));
            ExitCode::from(INTERRUPTED_EXIT)
        }
    })
}

fn interrupted_message(summary: &RunSummary) -> String {
    if summary.checkpoints_written == 0 {
        return "interrupted during burn-in; nothing recorded and no checkpoint written".to_string();
    }
    format!(
        "interrupted after {} of {} iterations; checkpoint saved to {}",
        summary.filled,
        summary.requested,
        summary.checkpoint_path.display()
    )
}

fn resolve_config(args: &McmcArgs) -> Result<RunConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };
    if let Some(value) = args.nwalkers {
        config.nwalkers = value;
    }
    if let Some(value) = args.nburn {
        config.nburn = value;
    }
    if let Some(value) = args.niters {
        config.niters = value;
    }
    if let Some(value) = &args.systems {
        config.systems = split_target_list(value);
    }
    if let Some(value) = &args.output_checkpoint {
        config.output_checkpoint = value.clone();
    }
    if let Some(value) = &args.output_chain {
        config.output_chain = value.clone();
    }
    if let Some(value) = &args.initial_parameters {
        config.initial_parameters = Some(value.clone());
    }
    if let Some(value) = args.chunk_size {
        config.chunk_size = value;
    }
    if let Some(value) = args.seed {
        config.seed_policy.master_seed = value;
    }
    if let Some(value) = &args.manifest {
        config.manifest = Some(value.clone());
    }
    config.continue_run |= args.continue_run;
    config.debug |= args.debug;
    config.no_chdir |= args.no_chdir;
    config.log_norm |= args.log_norm;
    Ok(config)
}

fn project_dir(project: &Path) -> Option<PathBuf> {
    project
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interrupted(filled: usize, checkpoints_written: usize) -> RunSummary {
        RunSummary {
            outcome: RunOutcome::Interrupted,
            filled,
            requested: 10,
            resumed_from: None,
            checkpoint_path: PathBuf::from("emcee.ckpt"),
            chain_path: None,
            checkpoints_written,
            acceptance_rate: 0.0,
            elapsed_secs: 1.0,
        }
    }

    #[test]
    fn burn_in_interrupt_does_not_claim_a_checkpoint() {
        let message = interrupted_message(&interrupted(0, 0));
        assert!(message.contains("no checkpoint written"));
        assert!(!message.contains("emcee.ckpt"));
    }

    #[test]
    fn sampling_interrupt_names_the_checkpoint() {
        let message = interrupted_message(&interrupted(4, 2));
        assert_eq!(
            message,
            "interrupted after 4 of 10 iterations; checkpoint saved to emcee.ckpt"
        );
    }
}
