//! copyguard — operator CLI.
//!
//! Draws band probabilities for bookmaker odds, answers a prediction for a
//! full odds line, and runs copycat detection over a JSON corpus snapshot.
//! Results are printed to stdout as JSON.

mod settings;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use copyguard_band::{BandGenerator, MatchOdds};
use copyguard_core::{AnalysisWindow, BandSide, League, MemoryCorpus, MinerId};
use copyguard_detect::{CopycatDetectionEngine, LeagueAnalysis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{error, info};

use settings::Settings;

/// Probability bands and copycat detection for sports predictions.
#[derive(Parser)]
#[command(name = "copyguard", version)]
struct Cli {
    /// Config file (default: <config dir>/copyguard/config.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Draw probabilities for one outcome's decimal odds.
    Probability(ProbabilityArgs),
    /// Pick an outcome from a full odds line and draw its probability.
    Predict(PredictArgs),
    /// Run copycat detection over a corpus snapshot.
    Analyze(AnalyzeArgs),
}

#[derive(Args)]
struct ProbabilityArgs {
    /// Decimal odds (> 1).
    #[arg(long)]
    odds: f64,

    /// Band side: favored or underdog.
    #[arg(long, default_value = "favored")]
    side: BandSide,

    /// Number of draws.
    #[arg(long, default_value_t = 1)]
    count: usize,

    /// Seed for reproducible draws (default: OS entropy).
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct PredictArgs {
    #[arg(long)]
    home_odds: f64,

    #[arg(long)]
    away_odds: f64,

    #[arg(long)]
    draw_odds: Option<f64>,

    /// League code or name (EPL, MLS, MLB, NBA, NFL).
    #[arg(long)]
    league: League,

    /// Band side: favored or underdog.
    #[arg(long, default_value = "favored")]
    side: BandSide,

    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// JSON snapshot with `matches` and `predictions` arrays.
    #[arg(long)]
    snapshot: PathBuf,

    /// Leagues to analyze (comma-separated; default: every league in the snapshot).
    #[arg(long, value_delimiter = ',')]
    league: Vec<League>,

    /// Only consider matches from the trailing N days.
    #[arg(long)]
    days: Option<u32>,

    /// End of the analysis window (RFC 3339; default: now).
    #[arg(long)]
    until: Option<DateTime<Utc>>,

    /// Participant ids to leave out of every relationship (comma-separated).
    #[arg(long, value_delimiter = ',')]
    exclude: Vec<u32>,

    /// Seed for audit sampling (default: OS entropy).
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct DrawReport {
    odds: f64,
    side: BandSide,
    probability: f64,
    band: copyguard_band::Band,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<String>,
}

impl DrawReport {
    fn new(odds: f64, side: BandSide, draw: &copyguard_band::ProbabilityDraw) -> Self {
        Self {
            odds,
            side,
            probability: draw.probability(),
            band: draw.band(),
            fallback: draw.fallback_reason().map(ToString::to_string),
        }
    }
}

#[derive(Serialize)]
struct PredictReport {
    league: League,
    choice: copyguard_core::ProbabilityChoice,
    probability: f64,
    band: copyguard_band::Band,
    #[serde(skip_serializing_if = "Option::is_none")]
    fallback: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Probability(args) => probability(settings, args),
        Commands::Predict(args) => predict(settings, args),
        Commands::Analyze(args) => analyze(settings, args).await,
    }
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn probability(settings: Settings, args: ProbabilityArgs) -> Result<()> {
    let generator = BandGenerator::with_rng(settings.band, rng(args.seed))
        .context("invalid band configuration")?;
    let draws: Vec<DrawReport> = (0..args.count)
        .map(|_| {
            let draw = generator.generate_probability(args.odds, args.side);
            DrawReport::new(args.odds, args.side, &draw)
        })
        .collect();
    print_json(&draws)
}

fn predict(settings: Settings, args: PredictArgs) -> Result<()> {
    let generator = BandGenerator::with_rng(settings.band, rng(args.seed))
        .context("invalid band configuration")?;
    let odds = MatchOdds {
        home: args.home_odds,
        away: args.away_odds,
        draw: args.draw_odds,
    };
    let prediction = generator.predict(&odds, args.league.sport(), args.side);
    print_json(&PredictReport {
        league: args.league,
        choice: prediction.choice,
        probability: prediction.probability(),
        band: prediction.draw.band(),
        fallback: prediction.draw.fallback_reason().map(ToString::to_string),
    })
}

fn analysis_window(days: Option<u32>, until: Option<DateTime<Utc>>) -> Result<AnalysisWindow> {
    match days {
        Some(days) => AnalysisWindow::trailing(until.unwrap_or_else(Utc::now), days)
            .with_context(|| format!("invalid analysis window of {days} days")),
        None => Ok(AnalysisWindow::unbounded()),
    }
}

async fn analyze(settings: Settings, args: AnalyzeArgs) -> Result<()> {
    let corpus = MemoryCorpus::load_json(&args.snapshot)
        .with_context(|| format!("failed to load snapshot {}", args.snapshot.display()))?;
    info!(
        matches = corpus.match_count(),
        predictions = corpus.prediction_count(),
        rejected = corpus.rejected(),
        "snapshot loaded"
    );

    let leagues = if args.league.is_empty() {
        corpus.leagues()
    } else {
        args.league
    };
    let window = analysis_window(args.days, args.until)?;
    let excluded: Arc<BTreeSet<MinerId>> = Arc::new(args.exclude.into_iter().map(MinerId).collect());

    let engine = Arc::new(
        CopycatDetectionEngine::with_rng(settings.detection, rng(args.seed))
            .context("invalid detection configuration")?,
    );
    let corpus = Arc::new(corpus);

    let tasks: Vec<_> = leagues
        .iter()
        .map(|&league| {
            let engine = Arc::clone(&engine);
            let corpus = Arc::clone(&corpus);
            let excluded = Arc::clone(&excluded);
            let handle = tokio::task::spawn_blocking(move || {
                engine.analyze_corpus(corpus.as_ref(), league, &window, &excluded)
            });
            (league, handle)
        })
        .collect();

    let mut results: Vec<LeagueAnalysis> = Vec::with_capacity(tasks.len());
    for (league, handle) in tasks {
        match handle.await {
            Ok(analysis) => results.push(analysis),
            Err(e) => {
                error!(%league, error = %e, "analysis task failed, no signal this epoch");
                results.push(LeagueAnalysis::empty(league));
            }
        }
    }

    print_json(&results)
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// `RUST_LOG` takes precedence over `level_str`. Logs go to stderr so stdout
/// stays valid JSON.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .init();
    }
}
