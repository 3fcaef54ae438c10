use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Serialize;
use sonic_core::RankResponse;
use sonic_engine::{
    AngleSource, CandidateSource, EngineConfig, EngineError, LocalFolderSource, PendingTrack, RankRequest,
    SeededAngles, SimilarityPipeline, ThreadRngAngles,
};
use sonic_paths::SonicPaths;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status for batch-fatal errors (JSON error body on stdout).
const EXIT_BATCH_FAILED: u8 = 2;

/// Rank audio files by acoustic similarity to a seed track.
#[derive(Parser, Debug)]
#[command(name = "sonic", version, about)]
struct Args {
    /// Seed audio file
    #[arg(short, long, required_unless_present = "print_config")]
    seed: Option<PathBuf>,

    /// Candidate audio files
    #[arg(short, long, num_args = 1..)]
    candidates: Vec<PathBuf>,

    /// Folder of candidate audio files (defaults to the songs dir when no
    /// candidates are given)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Settings file (TOML)
    #[arg(long, env = "SONIC_CONFIG")]
    config: Option<PathBuf>,

    /// Fix the layout angles for reproducible output
    #[arg(long)]
    angle_seed: Option<u64>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
}

impl<'a> ErrorBody<'a> {
    fn from_engine(err: &'a EngineError) -> Self {
        ErrorBody {
            error: ErrorDetail {
                code: err.code(),
                message: err.to_string(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    if args.print_config {
        print!("{}", config.to_toml().context("Failed to serialize configuration")?);
        return Ok(ExitCode::SUCCESS);
    }

    let Some(seed_path) = args.seed.clone() else {
        bail!("--seed is required");
    };
    if !seed_path.is_file() {
        bail!("Seed file not found: {}", seed_path.display());
    }

    let seed_identity = LocalFolderSource::identity_for(&seed_path);
    let candidates = collect_candidates(&args, &config, &seed_identity.id).await?;
    info!(seed = %seed_identity.name, candidates = candidates.len(), "ranking");

    let pipeline = match SimilarityPipeline::new(config) {
        Ok(pipeline) => pipeline,
        Err(err) => return emit_error(&err, args.pretty),
    };

    let mut angles: Box<dyn AngleSource + Send> = match args.angle_seed {
        Some(seed) => Box::new(SeededAngles::new(seed)),
        None => Box::new(ThreadRngAngles),
    };

    let request = RankRequest::new(seed_identity, seed_path).with_candidates(candidates);
    match pipeline.rank(request, angles.as_mut()).await {
        Ok(response) => {
            emit_response(&response, args.pretty)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => emit_error(&err, args.pretty),
    }
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    match &args.config {
        Some(path) => {
            if !path.is_file() {
                bail!("Config file not found: {}", path.display());
            }
            EngineConfig::load(Some(path.as_path())).with_context(|| format!("Failed to load {}", path.display()))
        }
        None => EngineConfig::load_default().context("Failed to load default settings"),
    }
}

async fn collect_candidates(
    args: &Args,
    config: &EngineConfig,
    seed_id: &sonic_core::TrackId,
) -> Result<Vec<PendingTrack>> {
    let mut tracks: Vec<PendingTrack> = args
        .candidates
        .iter()
        .map(|path| PendingTrack::candidate(LocalFolderSource::identity_for(path), path.clone()))
        .collect();

    let dir = match (&args.dir, args.candidates.is_empty()) {
        (Some(dir), _) => Some(dir.clone()),
        (None, true) => Some(SonicPaths::new().context("Failed to resolve the songs folder")?.songs_dir),
        (None, false) => None,
    };

    if let Some(dir) = dir {
        let source = LocalFolderSource::new(&dir, config.scan.min_file_size);
        let found = source
            .candidates()
            .await
            .with_context(|| format!("Failed to list {}", dir.display()))?;
        tracks.extend(found);
    }

    let mut seen = HashSet::new();
    seen.insert(seed_id.clone());
    tracks.retain(|t| {
        let keep = seen.insert(t.identity.id.clone());
        if !keep {
            warn!(name = %t.identity.name, "duplicate candidate skipped");
        }
        keep
    });
    Ok(tracks)
}

fn emit_response(response: &RankResponse, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(response)?
    } else {
        serde_json::to_string(response)?
    };
    println!("{out}");
    Ok(())
}

fn emit_error(err: &EngineError, pretty: bool) -> Result<ExitCode> {
    let body = ErrorBody::from_engine(err);
    let out = if pretty {
        serde_json::to_string_pretty(&body)?
    } else {
        serde_json::to_string(&body)?
    };
    println!("{out}");
    Ok(ExitCode::from(EXIT_BATCH_FAILED))
}
