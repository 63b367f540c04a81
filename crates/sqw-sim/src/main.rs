use std::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use sqw_corr::CorrelationSnapshot;
use sqw_sim::{run, write_queries, RunConfig};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sqw-sim", about = "Dynamical structure factor sampler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample trajectories and write the snapshot plus every configured query.
    Run(RunArgs),
    /// Re-evaluate the configured queries against a stored snapshot.
    Query(QueryArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// YAML configuration describing the run.
    #[arg(long)]
    config: PathBuf,
    /// Output directory for run artefacts.
    #[arg(long)]
    out: PathBuf,
    /// Overrides the configured master seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// YAML configuration whose `queries` section is evaluated.
    #[arg(long)]
    config: PathBuf,
    /// Snapshot written by `sqw-sim run`.
    #[arg(long)]
    snapshot: PathBuf,
    /// Output directory for query artefacts.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_writer(io::stderr).with_env_filter(filter).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_command(args),
        Command::Query(args) => query_command(args),
    }
}

fn load_config(path: &Path, out_dir: &Path) -> Result<RunConfig, Box<dyn Error>> {
    let contents = fs::read_to_string(path)?;
    let mut config: RunConfig = serde_yaml::from_str(&contents)?;
    config.output.run_directory = Some(out_dir.to_path_buf());
    Ok(config)
}

fn run_command(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(&args.config, &args.out)?;
    if let Some(seed) = args.seed {
        config.seed_policy.master_seed = seed;
    }
    let summary = run(&config, &args.out)?;
    fs::copy(&args.config, args.out.join("config.yaml"))?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn query_command(args: QueryArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(&args.config, &args.out)?;
    fs::create_dir_all(&args.out)?;
    let snapshot = CorrelationSnapshot::from_bytes(&fs::read(&args.snapshot)?)?;
    let correlations = snapshot.restore()?;
    let written = write_queries(&correlations, &config.queries, &args.out)?;
    println!("{}", serde_json::to_string_pretty(&written)?);
    Ok(())
}
