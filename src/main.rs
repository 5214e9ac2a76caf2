//! # tubecast CLI
//!
//! The `tubecast` binary bridges YouTube channels into podcast-ready RSS
//! feeds, either as a one-shot document on stdout or as a long-running
//! HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! tubecast --config ./config/tubecast.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tubecast fetch <channel>` | Assemble a channel's feed and print RSS |
//! | `tubecast serve` | Start the HTTP server |
//! | `tubecast cache stats` | Show per-playlist cache contents |
//! | `tubecast cache clear` | Drop all cached videos |
//!
//! ## Examples
//!
//! ```bash
//! # One-shot feed for a handle, newest 20 uploads
//! tubecast fetch @somechannel --limit 20
//!
//! # Serve feeds at http://127.0.0.1:9494/<channel>
//! tubecast serve
//!
//! # Inspect the cache
//! tubecast cache stats
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tubecast::{cache, cache_cmd, config, fetch, server};

/// tubecast — bridge YouTube channels into podcast-ready RSS feeds.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; a missing file runs on defaults with the API key taken from the
/// `TUBECAST_API_KEY` environment variable.
#[derive(Parser)]
#[command(
    name = "tubecast",
    about = "Bridge YouTube channels into podcast-ready RSS feeds",
    version,
    long_about = "tubecast resolves a YouTube channel, pages through its uploads via the \
    Data API v3, and serves the result as RSS. A persistent cache keeps repeat requests \
    to a single page of API quota for unchanged channels."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tubecast.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Assemble a channel's feed once and write RSS to stdout.
    ///
    /// The channel may be a raw channel id (`UC…`) or a handle (`@name`).
    /// No enclosure tags are emitted in this mode.
    Fetch {
        /// Channel id (`UC…`) or handle (`@name`).
        channel: String,

        /// Maximum number of feed items.
        #[arg(long)]
        limit: Option<usize>,

        /// Download format (passed through to the resolver command).
        #[arg(long)]
        format: Option<String>,

        /// MIME type to put into enclosure tags.
        #[arg(long = "mime-type")]
        mime_type: Option<String>,
    },

    /// Start the HTTP server.
    ///
    /// Serves `GET /{channel}` as RSS and `GET /watch` as a redirect to
    /// the video's direct media URL, resolved on demand via yt-dlp.
    Serve,

    /// Inspect or clear the local video cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Cache maintenance subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// Show per-playlist record counts and materialized depths.
    Stats,
    /// Drop every cached record.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Fetch {
            channel,
            limit,
            format,
            mime_type,
        } => {
            let cache = cache::open_cache(&cfg).await;
            fetch::run_fetch(&cfg, cache, &channel, limit, format, mime_type).await?;
        }
        Commands::Serve => {
            let cache = cache::open_cache(&cfg).await;
            server::run_server(&cfg, cache).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Stats => {
                cache_cmd::run_cache_stats(&cfg).await?;
            }
            CacheAction::Clear => {
                cache_cmd::run_cache_clear(&cfg).await?;
            }
        },
    }

    Ok(())
}
