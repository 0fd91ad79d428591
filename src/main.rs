use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use moodswing::catalog::snapshot::write_snapshot;
use moodswing::catalog::{CatalogClient, SnapshotCatalog, SpotifyCatalog};
use moodswing::config::AppConfig;
use moodswing::pipeline::ingest::ingest_library;
use moodswing::pipeline::periods::Period;
use moodswing::{MoodError, MoodProfile};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code when the library is too small to analyze.
const EXIT_NEEDS_MORE_DATA: u8 = 2;

#[derive(Parser)]
#[command(name = "moodswing", version, about = "Find mood cycles in your saved-track library")]
struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Saved tracks requested per page (1-50)
    #[arg(long, global = true, env = "MOODSWING_PAGE_SIZE")]
    page_size: Option<usize>,

    /// Track ids per audio-features request (1-100)
    #[arg(long, global = true, env = "MOODSWING_FEATURE_BATCH_SIZE")]
    feature_batch_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect mood cycles in the saved library
    Analyze {
        /// Analyze a snapshot file instead of the live library
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Catalog access token
        #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Rolling window for libraries of up to 1000 tracks (minimum 60)
        #[arg(short = 'w', long, env = "MOODSWING_ROLLING_WINDOW")]
        rolling_window: Option<usize>,

        /// Print the full mood profile as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save the live library to a snapshot file for offline analysis
    Export {
        /// Snapshot file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Catalog access token
        #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // CLI / env > config file > defaults
    let mut config = AppConfig::load();
    if let Some(page_size) = cli.page_size {
        config.pipeline.page_size = page_size;
    }
    if let Some(batch) = cli.feature_batch_size {
        config.pipeline.feature_batch_size = batch;
    }

    match cli.command {
        Commands::Analyze { snapshot, token, rolling_window, json } => {
            if let Some(window) = rolling_window {
                config.pipeline.rolling_window = window;
            }
            config.validate().context("Invalid configuration")?;

            let result = match snapshot {
                Some(path) => {
                    let catalog = SnapshotCatalog::open(&path)
                        .with_context(|| format!("Failed to open snapshot {}", path.display()))?;
                    analyze(&catalog, &config)
                }
                None => {
                    let catalog = SpotifyCatalog::new(require_token(token)?, &config.catalog);
                    analyze(&catalog, &config)
                }
            };

            let profile = match result {
                Ok(profile) => profile,
                Err(MoodError::InsufficientData { rows, required }) => {
                    println!("Not enough data yet: {rows} saved tracks, need at least {required}.");
                    println!("Save some more music and try again.");
                    return Ok(ExitCode::from(EXIT_NEEDS_MORE_DATA));
                }
                Err(e) => return Err(e).context("Mood analysis failed"),
            };

            if json {
                let out = serde_json::to_string_pretty(&profile)
                    .context("Failed to serialize mood profile")?;
                println!("{out}");
            } else {
                print_profile(&profile);
            }
        }

        Commands::Export { output, token } => {
            config.validate().context("Invalid configuration")?;
            let catalog = SpotifyCatalog::new(require_token(token)?, &config.catalog);
            let rows = ingest_library(
                &catalog,
                config.pipeline.page_size,
                config.pipeline.feature_batch_size,
            )
            .context("Library ingestion failed")?;
            write_snapshot(&output, &rows)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Exported {} tracks to {}", rows.len(), output.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn analyze<C: CatalogClient>(catalog: &C, config: &AppConfig) -> Result<MoodProfile, MoodError> {
    moodswing::build_mood_profile(catalog, &config.pipeline, &config.cycles)
}

fn require_token(token: Option<String>) -> Result<String> {
    match token {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => anyhow::bail!(
            "No access token. Pass --token or set SPOTIFY_ACCESS_TOKEN (or use --snapshot)."
        ),
    }
}

/// Print the summary and the periods table.
fn print_profile(profile: &MoodProfile) {
    println!(
        "Smoothed valence over {} points (rolling window {})",
        profile.values().len(),
        profile.rolling_window()
    );
    if let (Some(first), Some(last)) = (profile.labels().first(), profile.labels().last()) {
        println!("From {first} to {last}");
    }
    println!();

    if profile.periods().is_empty() {
        println!("No mood cycles survived filtering.");
        return;
    }

    println!(
        "{:>2}  {:<20} {:<20} {:>5} {:>6} {:>6}  {}",
        "#", "Start", "End", "Days", "Tracks", "Depth", "Lowest point"
    );
    println!("{}", "-".repeat(100));

    for p in profile.periods() {
        println!(
            "{:>2}  {:<20} {:<20} {:>5} {:>6} {:>6.3}  {}",
            p.number,
            p.start_date,
            p.end_date,
            p.duration_days,
            p.duration_entries,
            p.cycle_depth,
            truncate(&p.song_min_name, 35),
        );
    }

    println!();
    for p in profile.periods() {
        print_period_detail(profile, p);
    }
}

fn print_period_detail(profile: &MoodProfile, p: &Period) {
    let chart = profile.period_chart(p);
    let (lo, hi) = chart
        .values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    println!("Period {}: {} -> {}", p.number, p.start_date, p.end_date);
    println!("  starts with  {}", p.song_start_name);
    println!("  bottoms at   {} ({})", p.song_min_name, p.min_date);
    println!("  ends with    {}", p.song_end_name);
    if !chart.values.is_empty() {
        println!("  valence range {lo:.3} .. {hi:.3} over {} points", chart.values.len());
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}
