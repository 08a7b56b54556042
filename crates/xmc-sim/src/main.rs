use std::error::Error;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{
    export::{self, ExportArgs},
    inspect::{self, InspectArgs},
    mcmc::{self, McmcArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "xmc-sim", about = "Resumable ensemble MCMC for external spectral fits")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run or resume a chain against a project file.
    Mcmc(McmcArgs),
    /// Write the text chain of an existing checkpoint.
    Export(ExportArgs),
    /// Print a JSON summary of a checkpoint.
    Inspect(InspectArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let debug = matches!(&cli.command, Command::Mcmc(args) if args.debug);
    init_tracing(debug);

    let result: Result<ExitCode, Box<dyn Error>> = match cli.command {
        Command::Mcmc(args) => mcmc::run(args),
        Command::Export(args) => export::run(&args).map(|_| ExitCode::SUCCESS),
        Command::Inspect(args) => inspect::run(&args).map(|_| ExitCode::SUCCESS),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
