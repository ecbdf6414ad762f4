//! # Review Harvester CLI (`harvest`)
//!
//! The `harvest` binary drives the ingestion loop, runs single cycles for
//! debugging, serves the read API and inspects what has been stored.
//!
//! ## Usage
//!
//! ```bash
//! harvest --config ./config/harvest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `harvest init` | Create the SQLite database and run schema migrations |
//! | `harvest run` | Poll the configured films until Ctrl+C |
//! | `harvest once <film>` | Run one fetch/extract/classify/store cycle |
//! | `harvest serve` | Start the read-only HTTP service |
//! | `harvest recent` | Print the most recently ingested reviews |
//! | `harvest stats` | Per-film sentiment summary |
//! | `harvest classify "<text>"` | Score a piece of text without storing it |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use review_harvester::{config, ingest, migrate, recent, sentiment, server, stats};

/// Review Harvester: polls review listings, scores sentiment and stores
/// deduplicated reviews.
///
/// All commands except `classify` read a TOML configuration file. See
/// `config/harvest.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Review Harvester: a polling review ingestion pipeline with sentiment scoring",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/harvest.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Run the polling loop until Ctrl+C or SIGTERM.
    ///
    /// The first cycle starts immediately. Subsequent cycles start
    /// `[scheduler].interval_secs` after the previous one finishes.
    Run,

    /// Run a single cycle for one film and print its counters.
    Once {
        /// Film slug as it appears in the listing URL (e.g. `hot-fuzz`).
        subject: String,
    },

    /// Start the read-only HTTP service on `[server].bind`.
    Serve,

    /// Print the most recently ingested reviews, newest first.
    Recent {
        /// Number of reviews to show.
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Show per-film review counts and sentiment distribution.
    Stats,

    /// Score text with the sentiment analyzer. Needs no config.
    Classify {
        /// Text to score.
        text: String,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("review_harvester=info,tower_http=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Commands that don't require config
    let command = match cli.command {
        Commands::Classify { text } => {
            let result = sentiment::SentimentAnalyzer::new().classify(&text);
            println!("label: {}", result.label);
            println!("score: {:.4}", result.score);
            return Ok(());
        }
        command => command,
    };

    let cfg = config::load_config(&cli.config)?;

    match command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Run => {
            ingest::run_forever(&cfg).await?;
        }
        Commands::Once { subject } => {
            ingest::run_once(&cfg, &subject).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Recent { limit } => {
            recent::run_recent(&cfg, limit).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Classify { .. } => {}
    }

    Ok(())
}
