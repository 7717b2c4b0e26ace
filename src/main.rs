use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vecmean::job::Job;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    job_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Average {
        #[arg(long)]
        output: PathBuf,
    },

    Weights,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let job = Job::from_file(&args.job_file).context("failed to construct job")?;

    match args.command {
        Command::Average { output } => {
            let report = job.run();
            report
                .save(&output)
                .with_context(|| format!("failed to save {output:?}"))?;
            log::info!("saved {output:?}");
        }
        Command::Weights => match job.resolve_weights() {
            Some(weights) => log::info!("weights: {weights:?}"),
            None => log::info!("unweighted average"),
        },
    }

    Ok(())
}
