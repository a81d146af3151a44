//! Optiq CLI - score, recommend, and optimize content quality.
//!
//! # Usage
//!
//! ```bash
//! # Score a feature manifest against a profile
//! optiq score --profile broadcast.yaml episode.json
//!
//! # Rank what to fix first
//! optiq recommend --profile broadcast.yaml --priority high episode.json
//!
//! # Run the bounded optimization loop
//! optiq optimize --profile broadcast.yaml episode.json
//!
//! # Optimize many files with bounded concurrency
//! optiq optimize --profile broadcast.yaml --workers 8 media/*.json
//!
//! # Run the SEO and GEO tracks over text features
//! optiq tracks --profile content.yaml article.json
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use optiq_core::{validate_profile_schema, PriorityFilter, Profile};
use optiq_runtime::{optimize_batch, OptimizationService, RuntimeConfig};

/// Optiq - multi-modal content quality scoring and optimization.
#[derive(Parser)]
#[command(
    name = "optiq",
    version,
    about = "Score, recommend, and optimize content quality",
    long_about = "Optiq evaluates extracted content features against a quality\n\
                  profile, ranks the highest-impact improvements, and runs a\n\
                  bounded optimization loop toward the profile's target."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quality profile (YAML)
    #[arg(short, long, global = true)]
    profile: Option<PathBuf>,

    /// Runtime configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a feature manifest without changing anything
    Score {
        /// Feature manifest (JSON)
        manifest: PathBuf,
    },

    /// Rank open recommendations by estimated impact
    Recommend {
        /// Feature manifest (JSON)
        manifest: PathBuf,

        /// Only show recommendations at this priority (all, high, medium, low)
        #[arg(long, default_value = "all")]
        priority: String,
    },

    /// Run the bounded optimization loop; several files fan out with
    /// bounded concurrency
    Optimize {
        /// Feature manifests (JSON)
        manifests: Vec<PathBuf>,

        /// Maximum concurrent runs
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Run the SEO and GEO tracks over a text feature manifest
    Tracks {
        /// Feature manifest (JSON) with a text track
        manifest: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let profile = load_profile(cli.profile.as_deref())?;
    let mut config = load_config(cli.config.as_deref())?;

    if let Commands::Optimize { workers: Some(workers), .. } = &cli.command {
        config.max_concurrency = *workers;
    }

    let service = OptimizationService::new(profile, config);

    match cli.command {
        Commands::Score { manifest } => {
            let report = service.score_file(&manifest).await?;
            print_json(&report)?;
        }
        Commands::Recommend { manifest, priority } => {
            let filter: PriorityFilter = priority
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))
                .context("invalid --priority")?;
            let recommendations = service.recommend_file(&manifest, filter).await?;
            print_json(&recommendations)?;
        }
        Commands::Optimize { manifests, .. } => {
            if manifests.is_empty() {
                bail!("no manifests given");
            }
            if let [manifest] = manifests.as_slice() {
                let result = service.optimize_file(manifest).await?;
                print_json(&result)?;
            } else {
                let report = optimize_batch(Arc::new(service), manifests).await;
                print_json(&report)?;
            }
        }
        Commands::Tracks { manifest } => {
            let features = optiq_core::ContentFeatures::from_json_file(&manifest)
                .with_context(|| format!("reading manifest {}", manifest.display()))?;
            let Some(text) = features.text else {
                bail!("manifest {} has no text track", manifest.display());
            };
            let outcome = service.optimize_text(text);
            print_json(&outcome)?;
        }
    }

    Ok(())
}

/// Load and validate the quality profile. Schema violations are
/// reported together before semantic validation runs.
fn load_profile(path: Option<&std::path::Path>) -> Result<Profile> {
    let Some(path) = path else {
        bail!("--profile is required");
    };

    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading profile {}", path.display()))?;
    let value: serde_json::Value =
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    if let Err(errors) = validate_profile_schema(&value) {
        bail!("profile {} is invalid:\n  {}", path.display(), errors.join("\n  "));
    }

    Profile::from_yaml(&raw).with_context(|| format!("loading profile {}", path.display()))
}

fn load_config(path: Option<&std::path::Path>) -> Result<RuntimeConfig> {
    let Some(path) = path else {
        return Ok(RuntimeConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();
}
