use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wastegrid::manager::Manager;

/// Simulate and analyze waste collection runs stored in a simulation directory.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Directory holding `config.toml` and the run directories.
    #[arg(long)]
    sim_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a new run.
    Create,

    /// Extend a run by one trajectory file.
    Resume {
        #[arg(long)]
        run_idx: usize,
    },

    /// Print every agent of a run's latest checkpoint.
    Inspect {
        #[arg(long)]
        run_idx: usize,
    },

    /// Summarize the trajectories of every run.
    Analyze,

    /// Delete every run.
    Clean,
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
    let cli = Cli::parse();
    log::debug!("{cli:#?}");

    let mgr = Manager::new(&cli.sim_dir)
        .with_context(|| format!("failed to open simulation in {:?}", cli.sim_dir))?;

    match cli.command {
        Command::Create => mgr.create_run().context("failed to create run")?,
        Command::Resume { run_idx } => mgr
            .resume_run(run_idx)
            .with_context(|| format!("failed to resume run {run_idx}"))?,
        Command::Inspect { run_idx } => mgr
            .inspect_run(run_idx)
            .with_context(|| format!("failed to inspect run {run_idx}"))?,
        Command::Analyze => mgr.analyze_sim().context("failed to analyze runs")?,
        Command::Clean => mgr.clean_sim().context("failed to clean runs")?,
    }

    Ok(())
}
