//! Command-line dataset builder.

mod build;
mod config;
mod skills;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use crowdset_archive::ArchiveFormat;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

use crate::config::BuildConfig;

#[derive(Parser)]
#[command(author, version, about = "Crowdsourced identification dataset builder")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "crowdset.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Build the observation-label, worker-skill and test datasets.
  Build(BuildArgs),
  /// Report the most- and least-skilled worker at every taxonomy node.
  Skills(SkillsArgs),
}

#[derive(Args)]
struct BuildArgs {
  /// Path to the archive directory.
  #[arg(long)]
  archive_dir: PathBuf,

  /// Directory the datasets are written to.
  #[arg(long)]
  output_dir: PathBuf,

  /// Maximum number of observations per dataset.
  #[arg(long)]
  max_obs: Option<usize>,

  /// Seed for observation sampling.
  #[arg(long)]
  seed: Option<u64>,

  /// Archive layout; detected from the directory when omitted.
  #[arg(long)]
  format: Option<ArchiveFormat>,
}

#[derive(Args)]
struct SkillsArgs {
  /// CSV archive holding `taxonomy.csv`.
  #[arg(long)]
  archive_dir: PathBuf,

  /// JSON file of per-worker skills keyed by node.
  #[arg(long)]
  skills: PathBuf,

  /// Where to write the summary.
  #[arg(long, default_value = "worker_skill_summary.json")]
  output: PathBuf,
}

fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command {
    Command::Build(args) => {
      let mut config = BuildConfig::load(&cli.config)?;
      if let Some(max) = args.max_obs {
        config.max_observations = Some(max);
      }
      if let Some(seed) = args.seed {
        config.seed = Some(seed);
      }

      let format = match args.format {
        Some(format) => format,
        None => ArchiveFormat::detect(&args.archive_dir)
          .context("pass --format to choose the archive layout")?,
      };

      let seed = config.seed.unwrap_or_else(|| rand::rng().random());
      info!(seed, "seeded observation sampler");
      let mut rng = ChaCha8Rng::seed_from_u64(seed);

      build::run(&args.archive_dir, &args.output_dir, format, &config, &mut rng)
    }
    Command::Skills(args) => {
      skills::run(&args.archive_dir, &args.skills, &args.output)
    }
  }
}
