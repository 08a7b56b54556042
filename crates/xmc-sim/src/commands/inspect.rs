use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use xmc_mcmc::CheckpointStore;
use xmc_pool::ProjectSpec;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Checkpoint to summarise.
    #[arg(long)]
    pub checkpoint: PathBuf,
    /// Optional project file used to label the parameters.
    #[arg(long)]
    pub project: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct CheckpointSummary {
    schema_version: String,
    nwalkers: usize,
    filled: usize,
    ndims: usize,
    parameters: Vec<String>,
    last_mean_lnprob: Option<f64>,
    last_max_lnprob: Option<f64>,
}

pub fn run(args: &InspectArgs) -> Result<(), Box<dyn Error>> {
    let record = CheckpointStore::new(&args.checkpoint).load()?;
    let parameters = match &args.project {
        Some(path) => ProjectSpec::load(path)?
            .parameters
            .iter()
            .map(|param| param.name.clone())
            .collect(),
        None => Vec::new(),
    };

    let (last_mean_lnprob, last_max_lnprob) = match record.filled().checked_sub(1) {
        Some(last) => {
            let column = record.lnprobability.column(last);
            let finite: Vec<f64> = column.iter().copied().filter(|v| v.is_finite()).collect();
            let mean = (!finite.is_empty()).then(|| finite.iter().sum::<f64>() / finite.len() as f64);
            let max = finite.iter().copied().reduce(f64::max);
            (mean, max)
        }
        None => (None, None),
    };

    let version = record.schema_version;
    let summary = CheckpointSummary {
        schema_version: format!("{}.{}.{}", version.major, version.minor, version.patch),
        nwalkers: record.nwalkers(),
        filled: record.filled(),
        ndims: record.ndims(),
        parameters,
        last_mean_lnprob,
        last_max_lnprob,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
