//! rankctl
//!
//! 랭킹 엔진 운영 도구: 추천 미리보기, 시뮬레이션, 설정 출력

#[cfg(feature = "cli")]
use anyhow::{bail, Context, Result};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "rankctl")]
#[command(about = "Inspect and exercise the ranking engine", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Recommend a target rank for one player against AI opponents
    Recommend {
        /// Player segment (bronze..master)
        #[arg(long)]
        segment: String,

        /// Player score
        #[arg(long)]
        score: f64,

        /// Number of AI opponents
        #[arg(long, default_value = "3", allow_negative_numbers = true)]
        ai_count: i64,

        /// RNG seed (random when omitted)
        #[arg(long)]
        seed: Option<u64>,

        /// Engine config YAML file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Simulate a run of matches for one synthetic player
    Simulate {
        /// Starting segment
        #[arg(long)]
        segment: String,

        /// Number of matches
        #[arg(long, default_value = "50")]
        matches: u32,

        /// Progression economy: hard or soft
        #[arg(long, default_value = "hard")]
        mode: String,

        #[arg(long, default_value = "42")]
        seed: u64,

        /// Engine config YAML file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as YAML
    Config {
        /// Preset: standard, lenient or strict (default: RANK_PROFILE)
        #[arg(long)]
        profile: Option<String>,
    },
}

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> Result<()> {
    use rank_core::{EngineConfig, HumanPlayer, MemoryStore, ProgressionMode, RankRecommendationEngine, SegmentName};
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install tracing subscriber")?;

    match cli.command {
        Commands::Recommend { segment, score, ai_count, seed, config } => {
            let segment: SegmentName = segment.parse()?;
            let config: EngineConfig = rank_cli::load_config(config.as_deref(), None)?;
            let mut engine = match seed {
                Some(seed) => RankRecommendationEngine::seeded(&config, seed),
                None => RankRecommendationEngine::from_entropy(&config),
            };

            let store = MemoryStore::new();
            let result = engine
                .generate_match_rankings(&store, &[HumanPlayer::new("cli-player", score)], ai_count, segment)
                .await
                .context("Recommendation failed")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Simulate { segment, matches, mode, seed, config } => {
            let segment: SegmentName = segment.parse()?;
            let mut config = rank_cli::load_config(config.as_deref(), None)?;
            config.progression.mode = match mode.as_str() {
                "hard" => ProgressionMode::HardPoints,
                "soft" => ProgressionMode::SoftSp,
                other => bail!("Unknown mode '{}' (expected hard or soft)", other),
            };

            println!("🎲 Simulating {} matches from {} ({} mode, seed {})", matches, segment, mode, seed);
            let summary = rank_cli::simulate(config, segment, matches, seed).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Config { profile } => {
            let config = rank_cli::load_config(None, profile.as_deref())?;
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("rankctl is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
