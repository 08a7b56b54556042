use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use xmc_mcmc::{write_chain, CheckpointStore};
use xmc_pool::{apply_log_norm, ProjectSpec};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Project file the checkpoint was sampled from.
    pub project: PathBuf,
    /// Checkpoint to export.
    #[arg(long)]
    pub checkpoint: PathBuf,
    /// Destination text chain.
    #[arg(long)]
    pub out: PathBuf,
    /// The run sampled normalisation parameters in log10 space.
    #[arg(long)]
    pub log_norm: bool,
}

pub fn run(args: &ExportArgs) -> Result<(), Box<dyn Error>> {
    let project = ProjectSpec::load(&args.project)?;
    let mut model = project.parameters;
    if args.log_norm {
        apply_log_norm(&mut model);
    }
    let record = CheckpointStore::new(&args.checkpoint).load()?;
    let rows = write_chain(
        &args.out,
        record.chain.view(),
        record.lnprobability.view(),
        &model,
    )?;
    println!(
        "wrote {rows} rows ({} walkers x {} iterations) to {}",
        record.nwalkers(),
        record.filled(),
        args.out.display()
    );
    Ok(())
}
